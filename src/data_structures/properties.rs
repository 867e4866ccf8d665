//! Named access to component fields for the editor's properties panel.
//!
//! The panel talks in strings: a binding name such as `"light.ambient"` and a
//! value encoded as text, vectors as `"x,y,z"`. Edits arrive as
//! [`ViewEvent`]s and are applied by [`crate::scene::Scene::handle_view_events`].

use std::{fmt, str::FromStr};

use cgmath::Vector3;

use crate::{
    data_structures::{
        components::{LightComponent, TagComponent, TransformComponent},
        registry::{Entity, Registry},
    },
    error::NginError,
};

/// Button event that spawns a point light cube.
pub const CREATE_LIGHT_CUBE_EVENT: &str = "onCreateLightCubeButtonDown";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    Position,
    Rotation,
    Scale,
    LightAmbient,
    LightDiffuse,
    LightSpecular,
    LightConstant,
    LightLinear,
    LightQuadratic,
    LightCutOff,
    LightOuterCutOff,
    TagName,
}

impl Binding {
    pub const ALL: [Binding; 12] = [
        Binding::Position,
        Binding::Rotation,
        Binding::Scale,
        Binding::LightAmbient,
        Binding::LightDiffuse,
        Binding::LightSpecular,
        Binding::LightConstant,
        Binding::LightLinear,
        Binding::LightQuadratic,
        Binding::LightCutOff,
        Binding::LightOuterCutOff,
        Binding::TagName,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Binding::Position => "properties.position",
            Binding::Rotation => "properties.rotation",
            Binding::Scale => "properties.scale",
            Binding::LightAmbient => "light.ambient",
            Binding::LightDiffuse => "light.diffuse",
            Binding::LightSpecular => "light.specular",
            Binding::LightConstant => "light.constant",
            Binding::LightLinear => "light.linear",
            Binding::LightQuadratic => "light.quadratic",
            Binding::LightCutOff => "light.cutoff",
            Binding::LightOuterCutOff => "light.outerCutoff",
            Binding::TagName => "tag.name",
        }
    }

    pub fn value_type(self) -> BindingValueType {
        match self {
            Binding::Position
            | Binding::Rotation
            | Binding::Scale
            | Binding::LightAmbient
            | Binding::LightDiffuse
            | Binding::LightSpecular => BindingValueType::Vec3,
            Binding::LightConstant
            | Binding::LightLinear
            | Binding::LightQuadratic
            | Binding::LightCutOff
            | Binding::LightOuterCutOff => BindingValueType::Float,
            Binding::TagName => BindingValueType::Text,
        }
    }
}

impl FromStr for Binding {
    type Err = NginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Binding::ALL
            .into_iter()
            .find(|binding| binding.name() == s)
            .ok_or_else(|| NginError::Binding {
                name: s.to_string(),
                reason: "unknown binding".to_string(),
            })
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingValueType {
    Bool,
    Float,
    Int,
    Vec3,
    Text,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BindingValue {
    Bool(bool),
    Float(f32),
    Int(i32),
    Vec3(Vector3<f32>),
    Text(String),
}

impl BindingValue {
    pub fn value_type(&self) -> BindingValueType {
        match self {
            BindingValue::Bool(_) => BindingValueType::Bool,
            BindingValue::Float(_) => BindingValueType::Float,
            BindingValue::Int(_) => BindingValueType::Int,
            BindingValue::Vec3(_) => BindingValueType::Vec3,
            BindingValue::Text(_) => BindingValueType::Text,
        }
    }

    /// Decode the panel's text form.
    pub fn parse(value_type: BindingValueType, text: &str) -> Result<Self, NginError> {
        let invalid = |reason: String| NginError::Binding {
            name: format!("{:?}", value_type),
            reason,
        };
        let text = text.trim();
        match value_type {
            BindingValueType::Bool => text
                .parse()
                .map(BindingValue::Bool)
                .map_err(|e| invalid(format!("{:?}: {}", text, e))),
            BindingValueType::Float => text
                .parse()
                .map(BindingValue::Float)
                .map_err(|e| invalid(format!("{:?}: {}", text, e))),
            BindingValueType::Int => text
                .parse()
                .map(BindingValue::Int)
                .map_err(|e| invalid(format!("{:?}: {}", text, e))),
            BindingValueType::Vec3 => {
                let floats = text
                    .split(',')
                    .map(|part| part.trim().parse::<f32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| invalid(format!("{:?}: {}", text, e)))?;
                match floats.as_slice() {
                    [x, y, z] => Ok(BindingValue::Vec3(Vector3::new(*x, *y, *z))),
                    _ => Err(invalid(format!(
                        "expected three components, got {}",
                        floats.len()
                    ))),
                }
            }
            BindingValueType::Text => Ok(BindingValue::Text(text.to_string())),
        }
    }

    /// The panel's text form, `"x,y,z"` for vectors.
    pub fn encode(&self) -> String {
        match self {
            BindingValue::Bool(b) => b.to_string(),
            BindingValue::Float(f) => f.to_string(),
            BindingValue::Int(i) => i.to_string(),
            BindingValue::Vec3(v) => format!("{},{},{}", v.x, v.y, v.z),
            BindingValue::Text(s) => s.clone(),
        }
    }

    /// Numeric payload flattened to floats; empty for text.
    pub fn as_floats(&self) -> Vec<f32> {
        match self {
            BindingValue::Bool(b) => vec![if *b { 1.0 } else { 0.0 }],
            BindingValue::Float(f) => vec![*f],
            BindingValue::Int(i) => vec![*i as f32],
            BindingValue::Vec3(v) => vec![v.x, v.y, v.z],
            BindingValue::Text(_) => Vec::new(),
        }
    }
}

/// Something the properties panel asked for.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    /// A field was edited. `value` is in the panel's text form.
    Input {
        name: String,
        value_type: BindingValueType,
        value: String,
    },
    /// A button was pressed together with the panel's current vector and float fields.
    Button {
        name: String,
        vectors: Vec<Vector3<f32>>,
        floats: Vec<f32>,
    },
}

fn missing(binding: Binding, component: &str) -> NginError {
    NginError::Binding {
        name: binding.name().to_string(),
        reason: format!("entity has no {} component", component),
    }
}

pub fn get_binding(
    registry: &Registry,
    entity: Entity,
    binding: Binding,
) -> Result<BindingValue, NginError> {
    match binding {
        Binding::Position | Binding::Rotation | Binding::Scale => {
            let transform = registry
                .get::<TransformComponent>(entity)
                .ok_or_else(|| missing(binding, "transform"))?;
            Ok(BindingValue::Vec3(match binding {
                Binding::Position => transform.position,
                Binding::Rotation => transform.rotation,
                _ => transform.scale,
            }))
        }
        Binding::TagName => registry
            .get::<TagComponent>(entity)
            .map(|tag| BindingValue::Text(tag.name.clone()))
            .ok_or_else(|| missing(binding, "tag")),
        _ => {
            let light = registry
                .get::<LightComponent>(entity)
                .ok_or_else(|| missing(binding, "light"))?;
            Ok(match binding {
                Binding::LightAmbient => BindingValue::Vec3(light.ambient),
                Binding::LightDiffuse => BindingValue::Vec3(light.diffuse),
                Binding::LightSpecular => BindingValue::Vec3(light.specular),
                Binding::LightConstant => BindingValue::Float(light.constant),
                Binding::LightLinear => BindingValue::Float(light.linear),
                Binding::LightQuadratic => BindingValue::Float(light.quadratic),
                Binding::LightCutOff => BindingValue::Float(light.cut_off),
                _ => BindingValue::Float(light.outer_cut_off),
            })
        }
    }
}

pub fn set_binding(
    registry: &mut Registry,
    entity: Entity,
    binding: Binding,
    value: BindingValue,
) -> Result<(), NginError> {
    let mismatch = |value: &BindingValue| NginError::Binding {
        name: binding.name().to_string(),
        reason: format!(
            "expected a {:?} value, got {:?}",
            binding.value_type(),
            value.value_type()
        ),
    };

    match (binding, value) {
        (Binding::Position | Binding::Rotation | Binding::Scale, BindingValue::Vec3(v)) => {
            let transform = registry
                .get_mut::<TransformComponent>(entity)
                .ok_or_else(|| missing(binding, "transform"))?;
            match binding {
                Binding::Position => transform.position = v,
                Binding::Rotation => transform.rotation = v,
                _ => transform.scale = v,
            }
        }
        (Binding::TagName, BindingValue::Text(name)) => {
            registry
                .get_mut::<TagComponent>(entity)
                .ok_or_else(|| missing(binding, "tag"))?
                .name = name;
        }
        (
            Binding::LightAmbient | Binding::LightDiffuse | Binding::LightSpecular,
            BindingValue::Vec3(v),
        ) => {
            let light = registry
                .get_mut::<LightComponent>(entity)
                .ok_or_else(|| missing(binding, "light"))?;
            match binding {
                Binding::LightAmbient => light.ambient = v,
                Binding::LightDiffuse => light.diffuse = v,
                _ => light.specular = v,
            }
        }
        (
            Binding::LightConstant
            | Binding::LightLinear
            | Binding::LightQuadratic
            | Binding::LightCutOff
            | Binding::LightOuterCutOff,
            BindingValue::Float(f),
        ) => {
            let light = registry
                .get_mut::<LightComponent>(entity)
                .ok_or_else(|| missing(binding, "light"))?;
            match binding {
                Binding::LightConstant => light.constant = f,
                Binding::LightLinear => light.linear = f,
                Binding::LightQuadratic => light.quadratic = f,
                Binding::LightCutOff => light.cut_off = f,
                _ => light.outer_cut_off = f,
            }
        }
        (_, value) => return Err(mismatch(&value)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::components::LightKind;

    #[test]
    fn names_round_trip() {
        for binding in Binding::ALL {
            assert_eq!(binding.name().parse::<Binding>().unwrap(), binding);
        }
        assert!("light.colour".parse::<Binding>().is_err());
    }

    #[test]
    fn vectors_use_comma_encoding() {
        let value = BindingValue::parse(BindingValueType::Vec3, " 1.5, -2,0 ").unwrap();
        assert_eq!(value, BindingValue::Vec3(Vector3::new(1.5, -2.0, 0.0)));
        assert_eq!(value.encode(), "1.5,-2,0");
        assert_eq!(value.as_floats(), vec![1.5, -2.0, 0.0]);

        assert!(BindingValue::parse(BindingValueType::Vec3, "1,2").is_err());
        assert!(BindingValue::parse(BindingValueType::Float, "abc").is_err());
    }

    #[test]
    fn edits_reach_the_components() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.insert(e, TransformComponent::default());
        registry.insert(e, LightComponent::new(LightKind::Point));
        registry.insert(e, TagComponent::new("lamp"));

        set_binding(
            &mut registry,
            e,
            Binding::Position,
            BindingValue::Vec3(Vector3::new(1.0, 2.0, 3.0)),
        )
        .unwrap();
        set_binding(&mut registry, e, Binding::LightLinear, BindingValue::Float(0.5)).unwrap();
        set_binding(&mut registry, e, Binding::TagName, BindingValue::Text("sun".into())).unwrap();

        assert_eq!(
            get_binding(&registry, e, Binding::Position).unwrap().encode(),
            "1,2,3"
        );
        assert_eq!(
            get_binding(&registry, e, Binding::LightLinear).unwrap(),
            BindingValue::Float(0.5)
        );
        assert_eq!(registry.name(e), Some("sun"));
    }

    #[test]
    fn wrong_type_or_component_is_rejected() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.insert(e, TransformComponent::default());

        assert!(set_binding(&mut registry, e, Binding::Scale, BindingValue::Float(2.0)).is_err());
        assert!(get_binding(&registry, e, Binding::LightAmbient).is_err());
        assert_eq!(
            registry.get::<TransformComponent>(e).unwrap().scale,
            Vector3::new(1.0, 1.0, 1.0)
        );
    }
}
