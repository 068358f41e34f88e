//! Area-type registries injected into the editor.
//!
//! The engine never interprets area state itself. Whatever validates a new
//! area's type tag and initial state is handed in as an `Arc<dyn AreaRegistry>`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LayoutError;
use crate::layout::{Area, AreaRole, EMPTY_AREA_TYPE};

pub trait AreaRegistry: fmt::Debug + Send + Sync {
    fn is_known(&self, type_tag: &str) -> bool;

    fn default_state(&self, type_tag: &str) -> Value;

    fn validate_state(&self, _type_tag: &str, _state: &Value) -> Result<(), String> {
        Ok(())
    }

    /// Whether corner drags may split areas of this type.
    fn splittable(&self, _type_tag: &str) -> bool {
        true
    }
}

/// Accepts every type with a `null` default state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveRegistry;

impl AreaRegistry for PermissiveRegistry {
    fn is_known(&self, _type_tag: &str) -> bool {
        true
    }

    fn default_state(&self, _type_tag: &str) -> Value {
        Value::Null
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaType {
    #[serde(default)]
    pub default_state: Value,
    #[serde(default = "yes")]
    pub splittable: bool,
    #[serde(default)]
    pub state_must_be_object: bool,
}

fn yes() -> bool {
    true
}

impl Default for AreaType {
    fn default() -> Self {
        Self {
            default_state: Value::Null,
            splittable: true,
            state_must_be_object: false,
        }
    }
}

/// Explicit table of known area types. The `empty` type is always known.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: BTreeMap<String, AreaType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, type_tag: impl Into<String>, area_type: AreaType) -> Self {
        self.register(type_tag, area_type);
        self
    }

    pub fn register(&mut self, type_tag: impl Into<String>, area_type: AreaType) {
        self.types.insert(type_tag.into(), area_type);
    }

    pub fn get(&self, type_tag: &str) -> Option<&AreaType> {
        self.types.get(type_tag)
    }
}

impl AreaRegistry for TypeRegistry {
    fn is_known(&self, type_tag: &str) -> bool {
        type_tag == EMPTY_AREA_TYPE || self.types.contains_key(type_tag)
    }

    fn default_state(&self, type_tag: &str) -> Value {
        self.types
            .get(type_tag)
            .map(|area_type| area_type.default_state.clone())
            .unwrap_or(Value::Null)
    }

    fn validate_state(&self, type_tag: &str, state: &Value) -> Result<(), String> {
        match self.types.get(type_tag) {
            Some(area_type) if area_type.state_must_be_object && !state.is_object() => {
                Err(format!("state for `{type_tag}` must be a JSON object"))
            }
            _ => Ok(()),
        }
    }

    fn splittable(&self, type_tag: &str) -> bool {
        self.types.get(type_tag).is_none_or(|area_type| area_type.splittable)
    }
}

/// Caller-supplied description of an area to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDescriptor {
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub role: AreaRole,
}

impl AreaDescriptor {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            state: None,
            locked: false,
            role: AreaRole::Independent,
        }
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_role(mut self, role: AreaRole) -> Self {
        self.role = role;
        self
    }

    /// Check the descriptor against `registry` and build the area payload.
    /// A missing state takes the registry's default.
    pub fn validate(&self, registry: &dyn AreaRegistry) -> Result<Area, LayoutError> {
        if self.type_tag.trim().is_empty() {
            return Err(LayoutError::Validation("type tag is empty".to_string()));
        }
        if !registry.is_known(&self.type_tag) {
            return Err(LayoutError::Validation(format!(
                "unknown area type `{}`",
                self.type_tag
            )));
        }
        let state = match &self.state {
            Some(state) => state.clone(),
            None => registry.default_state(&self.type_tag),
        };
        registry
            .validate_state(&self.type_tag, &state)
            .map_err(LayoutError::Validation)?;
        Ok(Area {
            type_tag: self.type_tag.clone(),
            state,
            locked: self.locked,
            role: self.role,
        })
    }
}
