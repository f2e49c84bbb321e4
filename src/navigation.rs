//! Client-side navigation seam

/// Performs a client-side navigation.
///
/// The guard only ever calls this to send an unauthenticated user to the
/// login entry point, or after an explicit logout.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect(&self, path: &str) {
        self(path)
    }
}
