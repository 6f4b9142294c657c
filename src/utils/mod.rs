pub mod time;

/// Generates a url-safe random identifier for runs and approval requests.
pub fn longid() -> String {
    nanoid::nanoid!(21)
}
