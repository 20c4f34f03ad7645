use std::sync::{PoisonError, RwLock};

/// Restricts background synchronization to an allow-list of screens. A fetch
/// issued anywhere else is a no-op, not queued; the answer is re-evaluated on
/// every navigation.
#[derive(Debug)]
pub struct RouteGate {
    allowed: Vec<String>,
    current: RwLock<String>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.len() > 1 {
        trimmed.trim_end_matches('/').to_string()
    } else {
        trimmed.to_string()
    }
}

impl RouteGate {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        RouteGate {
            allowed: allowed.into_iter().map(|p| normalize(&p)).collect(),
            current: RwLock::new("/".to_string()),
        }
    }

    pub fn navigate(&self, path: &str) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = normalize(path);
    }

    pub fn current_path(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn allows(&self, path: &str) -> bool {
        let candidate = normalize(path);
        self.allowed.iter().any(|p| *p == candidate)
    }

    pub fn is_sync_allowed(&self) -> bool {
        self.allows(&self.current_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> RouteGate {
        RouteGate::new(vec![
            "/".to_string(),
            "/dashboard".to_string(),
            "/settings".to_string(),
        ])
    }

    #[test]
    fn home_is_allowed_by_default() {
        assert!(gate().is_sync_allowed());
    }

    #[test]
    fn navigation_changes_the_answer() {
        let gate = gate();
        gate.navigate("/students/S-1");
        assert!(!gate.is_sync_allowed());

        gate.navigate("/dashboard");
        assert!(gate.is_sync_allowed());
    }

    #[test]
    fn trailing_slash_is_not_a_different_screen() {
        let gate = gate();
        gate.navigate("/dashboard/");
        assert!(gate.is_sync_allowed());
        assert_eq!(gate.current_path(), "/dashboard");
    }

    #[test]
    fn unknown_paths_are_denied() {
        let gate = gate();
        assert!(!gate.allows("/reports"));
        assert!(!gate.allows("/dashboard/export"));
    }
}
