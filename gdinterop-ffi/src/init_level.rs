/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Stage of the engine's initialization process.
///
/// Levels are loaded like a stack, from `Core` upwards, and unloaded in reverse order. At each level, a different amount of
/// engine functionality is available; builtin values work from `Core` on.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum InitLevel {
    /// First level loaded by the engine. Builtin types are available, classes are not.
    Core,

    /// Second level. Only server classes and builtins are available.
    Servers,

    /// Third level. Most classes are available.
    Scene,

    /// Fourth level, only in the editor. All classes are available.
    Editor,
}

impl InitLevel {
    #[doc(hidden)]
    pub fn from_sys(level: crate::GDExtensionInitializationLevel) -> Self {
        match level {
            crate::GDEXTENSION_INITIALIZATION_CORE => Self::Core,
            crate::GDEXTENSION_INITIALIZATION_SERVERS => Self::Servers,
            crate::GDEXTENSION_INITIALIZATION_SCENE => Self::Scene,
            crate::GDEXTENSION_INITIALIZATION_EDITOR => Self::Editor,
            _ => {
                eprintln!("WARNING: unknown initialization level {level}");
                Self::Scene
            }
        }
    }

    #[doc(hidden)]
    pub fn to_sys(self) -> crate::GDExtensionInitializationLevel {
        match self {
            Self::Core => crate::GDEXTENSION_INITIALIZATION_CORE,
            Self::Servers => crate::GDEXTENSION_INITIALIZATION_SERVERS,
            Self::Scene => crate::GDEXTENSION_INITIALIZATION_SCENE,
            Self::Editor => crate::GDEXTENSION_INITIALIZATION_EDITOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_like_the_engine() {
        let levels = [InitLevel::Core, InitLevel::Servers, InitLevel::Scene, InitLevel::Editor];

        for (ord, level) in levels.into_iter().enumerate() {
            assert_eq!(level.to_sys(), ord as crate::GDExtensionInitializationLevel);
            assert_eq!(InitLevel::from_sys(level.to_sys()), level);
        }
        assert!(levels.is_sorted());
    }

    #[test]
    fn unknown_level_maps_to_scene() {
        assert_eq!(InitLevel::from_sys(crate::GDEXTENSION_MAX_INITIALIZATION_LEVEL), InitLevel::Scene);
    }
}
