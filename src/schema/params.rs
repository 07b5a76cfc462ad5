// Task parameter values: type coercion checks and template resolution.

use std::collections::BTreeMap;

use super::Validate;
use crate::error::{SchemaError, SchemaResult};
use crate::models::{ParameterType, TaskParameter, TaskTemplate};

/// Checks that `value` is acceptable for `param`; the error is a short reason phrase.
pub(crate) fn check_value(param: &TaskParameter, value: &str) -> Result<(), String> {
    match param.type_ {
        ParameterType::String => Ok(()),
        ParameterType::Number => match value.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(()),
            _ => Err(format!("{:?} is not a number", value)),
        },
        ParameterType::Boolean => match value {
            "true" | "false" => Ok(()),
            _ => Err(format!("{:?} is not a boolean (true/false)", value)),
        },
        ParameterType::Select => {
            let options = param.options.as_deref().unwrap_or_default();
            if options.iter().any(|o| o == value) {
                Ok(())
            } else {
                Err(format!("{:?} is not one of {:?}", value, options))
            }
        }
    }
}

/// Resolves supplied values against a template: fills defaults, rejects unknown names,
/// missing required parameters and values of the wrong type. Optional parameters with
/// neither value nor default are left out.
pub fn resolve_parameters(
    template: &TaskTemplate,
    supplied: &BTreeMap<String, String>,
) -> SchemaResult<BTreeMap<String, String>> {
    template.validate()?;

    if let Some(unknown) = supplied
        .keys()
        .find(|name| !template.parameters.iter().any(|p| &p.name == *name))
    {
        return Err(SchemaError::validation(
            TaskTemplate::ENTITY,
            format!("{}: unknown parameter {:?}", template.id, unknown),
        ));
    }

    let mut resolved = BTreeMap::new();
    for param in &template.parameters {
        let value = match supplied.get(&param.name).or(param.default.as_ref()) {
            Some(v) => v,
            None if param.required => {
                return Err(SchemaError::validation(
                    TaskTemplate::ENTITY,
                    format!("{}: missing required parameter {:?}", template.id, param.name),
                ));
            }
            None => continue,
        };
        check_value(param, value).map_err(|reason| {
            SchemaError::validation(
                TaskTemplate::ENTITY,
                format!("{}: parameter {:?} {}", template.id, param.name, reason),
            )
        })?;
        resolved.insert(param.name.clone(), value.clone());
    }
    Ok(resolved)
}
