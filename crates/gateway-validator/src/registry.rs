//! Maps the resource targeted by an admission request to the decoder and
//! validator of that resource.

use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use std::collections::HashMap;
use tracing::debug;

use crate::admission_review::{AdmissionRequest, Operation, ResourceIdentity};
use crate::codec::decode_object;
use crate::constants::GATEWAY_API_GROUP;
use crate::errors::{DecodeError, DispatchError};
use crate::field::FieldErrors;
use crate::resources::{
    Gateway, GatewayApiResource, GatewayClass, GrpcRoute, HttpRoute, TcpRoute, TlsRoute, UdpRoute,
};
use crate::validation;

pub type DecodeFn<T> = fn(&RawExtension) -> Result<T, DecodeError>;

/// The validation run for a registered resource
pub enum Check<T> {
    /// Validates the new state of the object on every CREATE and UPDATE
    Object(fn(&T) -> FieldErrors),
    /// Compares the old and the new state of the object. Runs on UPDATE
    /// only, other operations are admitted without decoding anything.
    Update(fn(&T, &T) -> FieldErrors),
}

/// Type-erased entry of the registry
trait Handler: Send + Sync {
    fn handle(&self, request: &AdmissionRequest) -> Result<FieldErrors, DecodeError>;
}

struct Registration<T> {
    decode: DecodeFn<T>,
    check: Check<T>,
}

impl<T> Registration<T> {
    fn decode_new(&self, request: &AdmissionRequest) -> Result<T, DecodeError> {
        let raw = request.object.as_ref().ok_or(DecodeError::MissingObject)?;
        (self.decode)(raw)
    }

    fn decode_old(&self, request: &AdmissionRequest) -> Result<T, DecodeError> {
        let raw = request
            .old_object
            .as_ref()
            .ok_or(DecodeError::MissingOldObject)?;
        (self.decode)(raw)
    }
}

impl<T: GatewayApiResource> Handler for Registration<T> {
    fn handle(&self, request: &AdmissionRequest) -> Result<FieldErrors, DecodeError> {
        match self.check {
            Check::Object(validate) => {
                let object = self.decode_new(request)?;
                Ok(validate(&object))
            }
            Check::Update(validate) => {
                if request.operation != Operation::Update {
                    return Ok(Vec::new());
                }
                let old = self.decode_old(request)?;
                let new = self.decode_new(request)?;
                Ok(validate(&old, &new))
            }
        }
    }
}

#[derive(Default)]
pub struct KindRegistryBuilder {
    handlers: HashMap<ResourceIdentity, Box<dyn Handler>>,
}

impl KindRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the decoder and the check of a resource. A later
    /// registration for the same identity replaces the earlier one.
    pub fn register<T: GatewayApiResource>(
        mut self,
        identity: ResourceIdentity,
        decode: DecodeFn<T>,
        check: Check<T>,
    ) -> Self {
        debug!(resource = %identity, kind = T::KIND, "registering resource");
        self.handlers
            .insert(identity, Box::new(Registration { decode, check }));
        self
    }

    pub fn build(self) -> KindRegistry {
        KindRegistry {
            handlers: self.handlers,
        }
    }
}

/// Immutable lookup table built at start-up and shared by all the requests
pub struct KindRegistry {
    handlers: HashMap<ResourceIdentity, Box<dyn Handler>>,
}

impl KindRegistry {
    pub fn builder() -> KindRegistryBuilder {
        KindRegistryBuilder::new()
    }

    /// Registry of all the Gateway API resources validated by the webhook
    pub fn gateway_api() -> Self {
        let identity = |version: &str, resource: &str| {
            ResourceIdentity::new(GATEWAY_API_GROUP, version, resource)
        };

        let mut builder = KindRegistry::builder()
            .register::<Gateway>(
                identity("v1alpha2", "gateways"),
                decode_object,
                Check::Object(validation::validate_gateway_listener_hostnames),
            )
            .register::<HttpRoute>(
                identity("v1alpha2", "httproutes"),
                decode_object,
                Check::Object(validation::validate_http_route_unique_filters),
            )
            .register::<GatewayClass>(
                identity("v1alpha2", "gatewayclasses"),
                decode_object,
                Check::Update(validation::validate_gateway_class_update),
            )
            .register::<GrpcRoute>(
                identity("v1alpha2", "grpcroutes"),
                decode_object,
                Check::Object(validation::validate_grpc_route),
            )
            .register::<TcpRoute>(
                identity("v1alpha2", "tcproutes"),
                decode_object,
                Check::Object(validation::validate_tcp_route),
            )
            .register::<UdpRoute>(
                identity("v1alpha2", "udproutes"),
                decode_object,
                Check::Object(validation::validate_udp_route),
            )
            .register::<TlsRoute>(
                identity("v1alpha2", "tlsroutes"),
                decode_object,
                Check::Object(validation::validate_tls_route),
            );

        for version in ["v1beta1", "v1"] {
            builder = builder
                .register::<Gateway>(
                    identity(version, "gateways"),
                    decode_object,
                    Check::Object(validation::validate_gateway),
                )
                .register::<HttpRoute>(
                    identity(version, "httproutes"),
                    decode_object,
                    Check::Object(validation::validate_http_route),
                )
                .register::<GatewayClass>(
                    identity(version, "gatewayclasses"),
                    decode_object,
                    Check::Update(validation::validate_gateway_class_update),
                );
        }

        builder.build()
    }

    pub fn contains(&self, identity: &ResourceIdentity) -> bool {
        self.handlers.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Decodes the object embedded in the request with the decoder
    /// registered for its resource and validates it.
    pub fn dispatch(&self, request: &AdmissionRequest) -> Result<FieldErrors, DispatchError> {
        let handler = self
            .handlers
            .get(&request.resource)
            .ok_or_else(|| DispatchError::UnknownResource(request.resource.clone()))?;
        Ok(handler.handle(request)?)
    }
}
