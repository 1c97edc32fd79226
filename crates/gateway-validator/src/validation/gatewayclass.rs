use crate::field::{FieldError, FieldErrors, FieldPath};
use crate::resources::GatewayClass;

use super::IMMUTABLE_FIELD_MESSAGE;

/// The controller owning a GatewayClass cannot change once the class exists
pub fn validate_gateway_class_update(old: &GatewayClass, new: &GatewayClass) -> FieldErrors {
    let mut errors = Vec::new();
    if old.spec.controller_name != new.spec.controller_name {
        errors.push(FieldError::invalid(
            FieldPath::new("spec").child("controllerName"),
            &new.spec.controller_name,
            IMMUTABLE_FIELD_MESSAGE,
        ));
    }
    errors
}
