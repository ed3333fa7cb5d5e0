/// Gives a routed payload type a human-readable name for log output.
pub trait Named {
    fn name(&self) -> &'static str;
}
