/// Observes every change a provider applies on commit, in application order.
///
/// All methods default to doing nothing, so a listener only implements what
/// it cares about.
pub trait StateChangeListener: Send + Sync {
    fn map_update(&self, _service: &str, _state_key: &str, _key: &[u8], _value: &[u8]) {}

    fn map_delete(&self, _service: &str, _state_key: &str, _key: &[u8]) {}

    fn singleton_update(&self, _service: &str, _state_key: &str, _value: &[u8]) {}

    fn queue_push(&self, _service: &str, _state_key: &str, _element: &[u8]) {}

    fn queue_pop(&self, _service: &str, _state_key: &str) {}
}
