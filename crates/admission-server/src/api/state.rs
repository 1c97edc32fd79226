use gateway_validator::AdmissionEngine;

pub(crate) struct ApiServerState {
    pub(crate) engine: AdmissionEngine,
}
