//! OpenAPI documentation configuration.

use blinder_types::api::{
    BlinderStatusResponse, BusGains, ErrorResponse, SelectRequest, SelectResponse,
    TopologyResponse,
};
use blinder_types::FillerSource;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::blinder::get_status,
        crate::api::blinder::select,
        crate::api::blinder::go_live,
        crate::api::blinder::get_topology,
    ),
    components(
        schemas(
            SelectRequest,
            SelectResponse,
            BlinderStatusResponse,
            BusGains,
            FillerSource,
            TopologyResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "blinder", description = "Filler-source switching for the mix buses")
    ),
    info(
        title = "Blinder API",
        version = "0.1.0",
        description = "Operator API for putting filler sources on air in place of the live program",
    )
)]
pub struct ApiDoc;
