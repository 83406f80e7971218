//! Outline configuration and per-frame resolution

use crate::render_graph::PassEvent;
use bevy_ecs::prelude::Resource;
use glam::Vec4;

/// Largest accepted outline width, in uv units
pub const MAX_OUTLINE_WIDTH: f32 = 0.01;

/// Clamp a width into `[0, MAX_OUTLINE_WIDTH]`. NaN maps to 0.
pub fn clamp_width(width: f32) -> f32 {
    if width.is_nan() {
        0.0
    } else {
        width.clamp(0.0, MAX_OUTLINE_WIDTH)
    }
}

/// Static outline settings, provided by the host and read-only here
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineSettings {
    pub color: Vec4,
    pub width: f32,
    pub rendering_layer_mask: u32,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            width: 0.004,
            rendering_layer_mask: 1,
        }
    }
}

impl OutlineSettings {
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = clamp_width(width);
        self
    }

    pub fn with_rendering_layer_mask(mut self, mask: u32) -> Self {
        self.rendering_layer_mask = mask;
        self
    }
}

/// A value that only takes effect when flagged as overridden
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverridableParameter<T> {
    pub value: T,
    pub overridden: bool,
}

impl<T: Copy> OverridableParameter<T> {
    /// A parameter that defers to the static default
    pub fn new(value: T) -> Self {
        Self {
            value,
            overridden: false,
        }
    }

    /// A parameter that overrides the static default
    pub fn overriding(value: T) -> Self {
        Self {
            value,
            overridden: true,
        }
    }

    pub fn override_with(&mut self, value: T) {
        self.value = value;
        self.overridden = true;
    }

    pub fn clear_override(&mut self) {
        self.overridden = false;
    }

    /// The override if set, `fallback` otherwise
    pub fn resolve(&self, fallback: T) -> T {
        if self.overridden {
            self.value
        } else {
            fallback
        }
    }
}

/// Runtime outline override, typically placed in the world by gameplay code
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct OutlineVolume {
    pub active: bool,
    pub color: OverridableParameter<Vec4>,
    pub width: OverridableParameter<f32>,
    pub rendering_layer_mask: OverridableParameter<u32>,
}

impl Default for OutlineVolume {
    fn default() -> Self {
        let defaults = OutlineSettings::default();
        Self {
            active: true,
            color: OverridableParameter::new(defaults.color),
            width: OverridableParameter::new(defaults.width),
            rendering_layer_mask: OverridableParameter::new(defaults.rendering_layer_mask),
        }
    }
}

impl OutlineVolume {
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color.override_with(color);
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width.override_with(clamp_width(width));
        self
    }

    pub fn with_rendering_layer_mask(mut self, mask: u32) -> Self {
        self.rendering_layer_mask.override_with(mask);
        self
    }
}

/// Effective settings for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineConfiguration {
    pub color: Vec4,
    pub width: f32,
    pub rendering_layer_mask: u32,
}

impl From<OutlineSettings> for OutlineConfiguration {
    fn from(settings: OutlineSettings) -> Self {
        Self {
            color: settings.color,
            width: clamp_width(settings.width),
            rendering_layer_mask: settings.rendering_layer_mask,
        }
    }
}

/// Merge the static settings with an optional runtime volume.
///
/// An absent or inactive volume yields the settings unchanged. Otherwise each
/// field falls back to the settings independently.
pub fn resolve(settings: &OutlineSettings, volume: Option<&OutlineVolume>) -> OutlineConfiguration {
    let Some(volume) = volume.filter(|v| v.active) else {
        return OutlineConfiguration::from(*settings);
    };

    OutlineConfiguration {
        color: volume.color.resolve(settings.color),
        width: clamp_width(volume.width.resolve(settings.width)),
        rendering_layer_mask: volume.rendering_layer_mask.resolve(settings.rendering_layer_mask),
    }
}

/// Where and how the outline pass is injected into a host pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineFeatureConfig {
    pub event: PassEvent,
    pub settings: OutlineSettings,
}

impl Default for OutlineFeatureConfig {
    fn default() -> Self {
        Self {
            event: PassEvent::BeforePostProcessing,
            settings: OutlineSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OutlineSettings {
        OutlineSettings::default()
            .with_color(Vec4::new(1.0, 0.5, 0.0, 1.0))
            .with_width(0.003)
            .with_rendering_layer_mask(0b100)
    }

    #[test]
    fn absent_volume_uses_settings() {
        let s = settings();
        assert_eq!(resolve(&s, None), OutlineConfiguration::from(s));
    }

    #[test]
    fn inactive_volume_uses_settings_wholesale() {
        let s = settings();
        let volume = OutlineVolume::default()
            .with_color(Vec4::ZERO)
            .with_width(0.009)
            .with_rendering_layer_mask(u32::MAX)
            .with_active(false);

        let resolved = resolve(&s, Some(&volume));
        assert_eq!(resolved.color, s.color);
        assert_eq!(resolved.width, s.width);
        assert_eq!(resolved.rendering_layer_mask, s.rendering_layer_mask);
    }

    #[test]
    fn fields_fall_back_independently() {
        let s = settings();
        let volume = OutlineVolume::default().with_width(0.008);

        let resolved = resolve(&s, Some(&volume));
        assert_eq!(resolved.width, 0.008);
        assert_eq!(resolved.color, s.color);
        assert_eq!(resolved.rendering_layer_mask, s.rendering_layer_mask);
    }

    #[test]
    fn non_overridden_volume_values_are_ignored() {
        let s = settings();
        let mut volume = OutlineVolume::default();
        volume.color.value = Vec4::new(0.0, 0.0, 1.0, 1.0);
        volume.rendering_layer_mask = OverridableParameter::overriding(0b1);

        let resolved = resolve(&s, Some(&volume));
        assert_eq!(resolved.color, s.color);
        assert_eq!(resolved.rendering_layer_mask, 0b1);
    }

    #[test]
    fn widths_are_clamped() {
        assert_eq!(OutlineSettings::default().with_width(0.5).width, MAX_OUTLINE_WIDTH);
        assert_eq!(OutlineSettings::default().with_width(-1.0).width, 0.0);
        assert_eq!(clamp_width(f32::NAN), 0.0);

        let mut volume = OutlineVolume::default();
        volume.width = OverridableParameter::overriding(1.0);
        assert_eq!(resolve(&OutlineSettings::default(), Some(&volume)).width, MAX_OUTLINE_WIDTH);
    }

    #[test]
    fn defaults() {
        let s = OutlineSettings::default();
        assert_eq!(s.color, Vec4::ONE);
        assert_eq!(s.width, 0.004);
        assert_eq!(s.rendering_layer_mask, 1);
        assert_eq!(OutlineFeatureConfig::default().event, PassEvent::BeforePostProcessing);
    }
}
