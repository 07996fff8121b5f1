//! Scene-switch hook: scripted veto/remap of pending switch requests.

/// Consulted before a pending scene switch is applied, whenever the scene
/// table holds more than one scene.
///
/// The hook runs *without* the process mutex held, so it may safely
/// re-enter engine operations such as `switch_scene`. Its return value
/// replaces the pending request: return the arguments unchanged to accept,
/// a different pair to remap, or `(-1, -1)` (or any unknown target) to
/// veto the switch.
pub trait SceneSwitchHook: Send + Sync {
    fn scene_switch(&self, scene: i32, subscene: i32) -> (i32, i32);
}

impl<F> SceneSwitchHook for F
where
    F: Fn(i32, i32) -> (i32, i32) + Send + Sync,
{
    fn scene_switch(&self, scene: i32, subscene: i32) -> (i32, i32) {
        self(scene, subscene)
    }
}
