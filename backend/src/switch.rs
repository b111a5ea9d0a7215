//! Switch controller: holds the on-air selection and keeps every mix bus's
//! pad gains consistent with it.
//!
//! Every change performs a full gain push: the gains of every bus are
//! recomputed from the current [`Selection`] and written to the host. Gains
//! are never derived from what the host currently holds, so re-attaching to
//! a rebuilt pipeline always converges to the same state.

use blinder_types::api::BusGains;
use blinder_types::{gain_vector, BlinderEvent, FillerSource, GraphTopology, MixBusSpec};
use blinder_types::{Selection, SelectionChoice};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::BlinderError;
use crate::events::EventBroadcaster;
use crate::host::GraphHost;

/// Outcome of a gain push.
///
/// Unresolvable buses and pads are collected here instead of failing the
/// push, so one missing bus never blocks the others.
#[derive(Debug, Default)]
pub struct GainPushReport {
    /// Buses whose gains were fully written.
    pub applied: Vec<String>,
    /// Per-bus failures (`BusNotFound` / `PadNotFound`).
    pub missing: Vec<BlinderError>,
}

impl GainPushReport {
    /// True when every bus was written.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

struct SwitchState {
    selection: Selection,
    host: Option<Arc<dyn GraphHost>>,
}

/// Owns the blinder selection.
pub struct SwitchController {
    topology: Arc<GraphTopology>,
    state: Mutex<SwitchState>,
    events: Option<EventBroadcaster>,
}

impl SwitchController {
    /// Create a controller for a topology.
    ///
    /// Starts blinded on the first filler source when one is configured, so
    /// nothing goes on air until an operator explicitly selects live.
    pub fn new(topology: Arc<GraphTopology>) -> Self {
        let selection = if topology.fillers.is_empty() {
            Selection::Live
        } else {
            Selection::Blinded(0)
        };
        Self {
            topology,
            state: Mutex::new(SwitchState {
                selection,
                host: None,
            }),
            events: None,
        }
    }

    /// Broadcast selection changes and missing buses on `events`.
    pub fn with_events(mut self, events: EventBroadcaster) -> Self {
        events.set_on_air(self.selection());
        self.events = Some(events);
        self
    }

    pub fn topology(&self) -> &GraphTopology {
        &self.topology
    }

    pub fn fillers(&self) -> &[FillerSource] {
        &self.topology.fillers
    }

    pub fn selection(&self) -> Selection {
        self.state.lock().selection
    }

    /// Name of the filler source currently on air.
    pub fn active_filler(&self) -> Option<&FillerSource> {
        self.selection()
            .blinded_index()
            .and_then(|i| self.topology.fillers.get(i))
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().host.is_some()
    }

    /// Bind to a running graph and bring it in line with the current selection.
    ///
    /// Replaces any previously attached host.
    pub fn attach(&self, host: Arc<dyn GraphHost>) -> GainPushReport {
        let mut state = self.state.lock();
        state.host = Some(host.clone());
        let selection = state.selection;
        info!("{} attached, pushing {}", self, selection);

        let report = self.push_gains(host.as_ref(), selection);
        // Under the lock, so subscribers see changes in the order they were applied
        self.notify(BlinderEvent::Attached { selection }, &report);
        drop(state);
        report
    }

    /// Release the attached host, e.g. before tearing down its pipeline.
    pub fn detach(&self) {
        if self.state.lock().host.take().is_some() {
            info!("{} detached", self);
        }
    }

    /// Resolve an operator choice against the configured filler sources.
    pub fn resolve(&self, choice: &SelectionChoice) -> Result<Selection, BlinderError> {
        let count = self.topology.fillers.len();
        match choice {
            SelectionChoice::Live => Ok(Selection::Live),
            SelectionChoice::Index(index) if *index < count => Ok(Selection::Blinded(*index)),
            SelectionChoice::Index(index) => Err(BlinderError::InvalidSelection {
                index: *index,
                count,
            }),
            SelectionChoice::Name(name) => self
                .topology
                .fillers
                .iter()
                .find(|f| &f.name == name)
                .map(|f| Selection::Blinded(f.index))
                .ok_or_else(|| BlinderError::UnknownFiller(name.clone())),
        }
    }

    /// Put a filler source (or the live program) on air.
    ///
    /// An invalid choice leaves the selection untouched. Without an attached
    /// host only the selection changes; the next [`attach`](Self::attach)
    /// pushes it.
    pub fn select(
        &self,
        choice: impl Into<SelectionChoice>,
    ) -> Result<GainPushReport, BlinderError> {
        let choice = choice.into();
        let selection = self.resolve(&choice)?;

        let mut state = self.state.lock();
        let previous = state.selection;
        state.selection = selection;
        info!("{}: {} -> {}", self, previous, selection);

        let report = match &state.host {
            Some(host) => self.push_gains(host.as_ref(), selection),
            None => {
                debug!("No pipeline attached, selection stored only");
                GainPushReport::default()
            }
        };
        self.notify(
            BlinderEvent::SelectionChanged {
                previous,
                selection,
            },
            &report,
        );
        drop(state);
        Ok(report)
    }

    /// Gains every bus should carry for the current selection.
    pub fn bus_gains(&self) -> Vec<BusGains> {
        let selection = self.selection();
        self.topology
            .buses
            .iter()
            .map(|bus| BusGains {
                bus: bus.name.clone(),
                role: bus.role,
                gains: gain_vector(selection, bus.kind, self.topology.fillers.len()),
            })
            .collect()
    }

    fn push_gains(&self, host: &dyn GraphHost, selection: Selection) -> GainPushReport {
        let mut report = GainPushReport::default();
        for bus in &self.topology.buses {
            let gains = gain_vector(selection, bus.kind, self.topology.fillers.len());
            match apply_bus_gains(host, bus, &gains) {
                Ok(()) => report.applied.push(bus.name.clone()),
                Err(e) => {
                    error!("Failed to apply blinder state to '{}': {}", bus.name, e);
                    report.missing.push(e);
                }
            }
        }
        report
    }

    fn notify(&self, event: BlinderEvent, report: &GainPushReport) {
        let Some(events) = &self.events else {
            return;
        };
        events.broadcast(event);
        for e in &report.missing {
            let bus = match e {
                BlinderError::BusNotFound(bus) | BlinderError::PadNotFound { bus, .. } => {
                    bus.clone()
                }
                other => other.to_string(),
            };
            events.broadcast(BlinderEvent::BusMissing { bus });
        }
    }
}

impl fmt::Display for SwitchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .topology
            .fillers
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        write!(f, "Blinder[{}]", names.join(","))
    }
}

/// Write one bus's gains, inactive pads first so two pads are never on at once.
///
/// A missing pad does not stop the remaining pads from being written; the
/// first failure is returned.
fn apply_bus_gains(
    host: &dyn GraphHost,
    bus: &MixBusSpec,
    gains: &[f64],
) -> Result<(), BlinderError> {
    let mixer = host.resolve_bus(&bus.name)?;
    let property = bus.kind.gain_property();

    let off = gains.iter().enumerate().filter(|(_, g)| **g == 0.0);
    let on = gains.iter().enumerate().filter(|(_, g)| **g != 0.0);

    let mut result = Ok(());
    for (pad, gain) in off.chain(on) {
        debug!("{}:sink_{} {}={}", bus.name, pad, property, gain);
        if let Err(e) = mixer.set_pad_gain(pad, property, *gain) {
            if result.is_ok() {
                result = Err(e);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryGraphHost, MixBus};
    use crate::topology::{
        build_topology, BlinderSettings, AUDIO_BUS, PRIMARY_BUS, SECONDARY_BUS,
    };

    fn controller(sources: &[&str], secondary: bool) -> SwitchController {
        let settings = BlinderSettings {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            secondary,
            ..Default::default()
        };
        SwitchController::new(Arc::new(build_topology(&settings).unwrap()))
    }

    fn attached(sources: &[&str], secondary: bool) -> (SwitchController, Arc<MemoryGraphHost>) {
        let controller = controller(sources, secondary);
        let host = Arc::new(MemoryGraphHost::from_topology(controller.topology()));
        let report = controller.attach(host.clone());
        assert!(report.is_complete());
        (controller, host)
    }

    /// Host that records every write in order.
    #[derive(Default)]
    struct RecordingHost {
        writes: Mutex<Vec<(String, usize, f64)>>,
    }

    struct RecordingBus<'a> {
        host: &'a RecordingHost,
        name: String,
    }

    impl MixBus for RecordingBus<'_> {
        fn set_pad_gain(
            &self,
            pad_index: usize,
            _property: &str,
            value: f64,
        ) -> Result<(), BlinderError> {
            self.host
                .writes
                .lock()
                .push((self.name.clone(), pad_index, value));
            Ok(())
        }
    }

    impl GraphHost for RecordingHost {
        fn resolve_bus(&self, name: &str) -> Result<Box<dyn MixBus + '_>, BlinderError> {
            Ok(Box::new(RecordingBus {
                host: self,
                name: name.to_string(),
            }))
        }
    }

    #[test]
    fn test_initial_selection() {
        assert_eq!(
            controller(&["slate", "test-card"], false).selection(),
            Selection::Blinded(0)
        );
        assert_eq!(controller(&[], false).selection(), Selection::Live);
    }

    #[test]
    fn test_attach_pushes_initial_state() {
        let (_controller, host) = attached(&["slate", "test-card"], false);
        assert_eq!(host.gains(PRIMARY_BUS), Some(vec![0.0, 1.0, 0.0]));
        assert_eq!(host.gains(AUDIO_BUS), Some(vec![0.0, 1.0]));
        assert_eq!(host.property(PRIMARY_BUS).as_deref(), Some("alpha"));
        assert_eq!(host.property(AUDIO_BUS).as_deref(), Some("volume"));
    }

    #[test]
    fn test_default_state_scenario() {
        let (controller, host) = attached(&["slate", "test-card"], false);

        controller.select(SelectionChoice::Live).unwrap();
        assert_eq!(controller.selection(), Selection::Live);
        assert_eq!(host.gains(PRIMARY_BUS), Some(vec![1.0, 0.0, 0.0]));
        assert_eq!(host.gains(AUDIO_BUS), Some(vec![1.0, 0.0]));

        controller.select(SelectionChoice::Index(1)).unwrap();
        assert_eq!(controller.selection(), Selection::Blinded(1));
        assert_eq!(host.gains(PRIMARY_BUS), Some(vec![0.0, 0.0, 1.0]));
        assert_eq!(host.gains(AUDIO_BUS), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_every_selection_has_one_active_video_pad() {
        let (controller, host) = attached(&["a", "b", "c"], true);
        let mut choices = vec![SelectionChoice::Live];
        choices.extend((0..3).map(SelectionChoice::Index));

        for choice in choices {
            controller.select(choice.clone()).unwrap();
            for bus in [PRIMARY_BUS, SECONDARY_BUS] {
                let gains = host.gains(bus).unwrap();
                assert_eq!(gains.iter().filter(|g| **g == 1.0).count(), 1, "{}", choice);
                assert_eq!(gains.iter().filter(|g| **g == 0.0).count(), 3, "{}", choice);
            }
            let audio = host.gains(AUDIO_BUS).unwrap();
            assert_eq!(audio[0] + audio[1], 1.0);
            assert!(audio[0] == 0.0 || audio[1] == 0.0);
        }
    }

    #[test]
    fn test_secondary_mirrors_primary() {
        let (controller, host) = attached(&["slate", "test-card"], true);
        assert_eq!(host.gains(PRIMARY_BUS), host.gains(SECONDARY_BUS));

        for choice in ["live", "1", "slate"] {
            controller
                .select(choice.parse::<SelectionChoice>().unwrap())
                .unwrap();
            assert_eq!(host.gains(PRIMARY_BUS), host.gains(SECONDARY_BUS));
        }
    }

    #[test]
    fn test_select_is_idempotent() {
        let (controller, host) = attached(&["slate", "test-card"], true);
        controller.select(SelectionChoice::Index(1)).unwrap();
        let once = controller.bus_gains();
        let primary_once = host.gains(PRIMARY_BUS);

        controller.select(SelectionChoice::Index(1)).unwrap();
        assert_eq!(controller.bus_gains(), once);
        assert_eq!(host.gains(PRIMARY_BUS), primary_once);
    }

    #[test]
    fn test_select_by_name() {
        let (controller, host) = attached(&["slate", "test-card"], false);
        controller
            .select(SelectionChoice::Name("test-card".to_string()))
            .unwrap();
        assert_eq!(controller.selection(), Selection::Blinded(1));
        assert_eq!(
            controller.active_filler().map(|f| f.name.as_str()),
            Some("test-card")
        );
        assert_eq!(host.gains(PRIMARY_BUS), Some(vec![0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_invalid_selection_leaves_state_unchanged() {
        let (controller, host) = attached(&["slate", "test-card"], false);
        let writes = host.write_count();

        let result = controller.select(SelectionChoice::Index(2));
        assert!(matches!(
            result,
            Err(BlinderError::InvalidSelection { index: 2, count: 2 })
        ));
        assert_eq!(controller.selection(), Selection::Blinded(0));
        assert_eq!(host.write_count(), writes);

        let result = controller.select(SelectionChoice::Name("nope".to_string()));
        assert!(matches!(result, Err(BlinderError::UnknownFiller(_))));
        assert_eq!(controller.selection(), Selection::Blinded(0));
    }

    #[test]
    fn test_no_fillers_only_live_is_valid() {
        let (controller, host) = attached(&[], false);
        assert_eq!(host.gains(PRIMARY_BUS), Some(vec![1.0]));
        assert_eq!(host.gains(AUDIO_BUS), Some(vec![1.0, 0.0]));

        assert!(matches!(
            controller.select(SelectionChoice::Index(0)),
            Err(BlinderError::InvalidSelection { index: 0, count: 0 })
        ));
        assert_eq!(controller.selection(), Selection::Live);
        assert!(controller.select(SelectionChoice::Live).is_ok());
    }

    #[test]
    fn test_missing_bus_is_reported_not_fatal() {
        let (controller, host) = attached(&["slate", "test-card"], true);
        assert!(host.remove_bus(SECONDARY_BUS));

        let report = controller.select(SelectionChoice::Live).unwrap();
        assert_eq!(report.applied, vec![PRIMARY_BUS, AUDIO_BUS]);
        assert_eq!(report.missing.len(), 1);
        assert!(matches!(
            &report.missing[0],
            BlinderError::BusNotFound(name) if name == SECONDARY_BUS
        ));
        assert!(report.missing[0].is_bus_local());

        assert_eq!(controller.selection(), Selection::Live);
        assert_eq!(host.gains(PRIMARY_BUS), Some(vec![1.0, 0.0, 0.0]));
        assert_eq!(host.gains(AUDIO_BUS), Some(vec![1.0, 0.0]));
    }

    #[test]
    fn test_missing_bus_recovers_on_next_push() {
        let (controller, host) = attached(&["slate"], true);
        host.remove_bus(SECONDARY_BUS);
        controller.select(SelectionChoice::Live).unwrap();

        host.add_bus(SECONDARY_BUS, 2);
        let report = controller.select(SelectionChoice::Live).unwrap();
        assert!(report.is_complete());
        assert_eq!(host.gains(SECONDARY_BUS), Some(vec![1.0, 0.0]));
    }

    #[test]
    fn test_missing_pad_still_writes_remaining_pads() {
        let controller = controller(&["slate", "test-card"], false);
        let host = Arc::new(MemoryGraphHost::from_topology(controller.topology()));
        // Primary mixer only has two of its three pads
        host.add_bus(PRIMARY_BUS, 2);

        let report = controller.attach(host.clone());
        assert!(matches!(
            &report.missing[..],
            [BlinderError::PadNotFound { bus, pad }] if bus == PRIMARY_BUS && pad == "sink_2"
        ));
        assert_eq!(host.gains(PRIMARY_BUS), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_select_without_host_then_attach() {
        let controller = controller(&["slate", "test-card"], false);
        let report = controller.select(SelectionChoice::Live).unwrap();
        assert!(report.applied.is_empty());
        assert!(!controller.is_attached());

        let host = Arc::new(MemoryGraphHost::from_topology(controller.topology()));
        controller.attach(host.clone());
        assert_eq!(host.gains(PRIMARY_BUS), Some(vec![1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_reattach_derives_from_selection_not_host() {
        let (controller, _first) = attached(&["slate", "test-card"], true);
        controller.select(SelectionChoice::Index(1)).unwrap();

        // A rebuilt pipeline starts with every pad at full gain
        let second = Arc::new(MemoryGraphHost::from_topology(controller.topology()));
        assert_eq!(second.gains(PRIMARY_BUS), Some(vec![1.0, 1.0, 1.0]));

        controller.attach(second.clone());
        assert_eq!(second.gains(PRIMARY_BUS), Some(vec![0.0, 0.0, 1.0]));
        assert_eq!(second.gains(SECONDARY_BUS), Some(vec![0.0, 0.0, 1.0]));
        assert_eq!(second.gains(AUDIO_BUS), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_detach() {
        let (controller, host) = attached(&["slate"], false);
        controller.detach();
        assert!(!controller.is_attached());

        let writes = host.write_count();
        controller.select(SelectionChoice::Live).unwrap();
        assert_eq!(host.write_count(), writes);
    }

    #[test]
    fn test_inactive_pads_written_before_active() {
        let controller = controller(&["slate", "test-card"], false);
        let host = Arc::new(RecordingHost::default());
        controller.attach(host.clone());

        let writes = host.writes.lock().clone();
        let primary: Vec<_> = writes
            .iter()
            .filter(|(bus, _, _)| bus == PRIMARY_BUS)
            .map(|(_, pad, gain)| (*pad, *gain))
            .collect();
        assert_eq!(primary, vec![(0, 0.0), (2, 0.0), (1, 1.0)]);
    }

    #[test]
    fn test_concurrent_selects_never_interleave() {
        let controller = Arc::new(controller(&["a", "b", "c", "d"], true));
        let host = Arc::new(MemoryGraphHost::from_topology(controller.topology()));
        controller.attach(host.clone());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let controller = controller.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let choice = if (t + i) % 5 == 4 {
                            SelectionChoice::Live
                        } else {
                            SelectionChoice::Index((t + i) % 5)
                        };
                        controller.select(choice).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected = controller.bus_gains();
        for bus in expected {
            assert_eq!(host.gains(&bus.bus), Some(bus.gains));
        }
    }

    #[test]
    fn test_events_broadcast() {
        let events = EventBroadcaster::new(16);
        let mut rx = events.receiver();
        let controller = controller(&["slate"], true).with_events(events);
        let host = Arc::new(MemoryGraphHost::from_topology(controller.topology()));
        host.remove_bus(SECONDARY_BUS);

        controller.attach(host);
        controller.select(SelectionChoice::Live).unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            BlinderEvent::Attached {
                selection: Selection::Blinded(0)
            }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            BlinderEvent::BusMissing { bus } if bus == SECONDARY_BUS
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            BlinderEvent::SelectionChanged {
                previous: Selection::Blinded(0),
                selection: Selection::Live
            }
        ));
    }

    #[test]
    fn test_concurrent_selects_broadcast_in_applied_order() {
        let events = EventBroadcaster::new(1024);
        let mut rx = events.receiver();
        let controller = Arc::new(controller(&["a", "b", "c"], true).with_events(events));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let controller = controller.clone();
                std::thread::spawn(move || {
                    for i in 0..40 {
                        let choice = match (t + i) % 4 {
                            3 => SelectionChoice::Live,
                            n => SelectionChoice::Index(n),
                        };
                        controller.select(choice).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut on_air = Selection::Blinded(0);
        let mut changes = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                BlinderEvent::SelectionChanged {
                    previous,
                    selection,
                } => {
                    assert_eq!(previous, on_air, "event {} does not chain", changes);
                    on_air = selection;
                    changes += 1;
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(changes, 8 * 40);
        assert_eq!(on_air, controller.selection());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            controller(&["slate", "test-card"], false).to_string(),
            "Blinder[slate,test-card]"
        );
        assert_eq!(controller(&[], false).to_string(), "Blinder[]");
    }
}
