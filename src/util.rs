use uuid::Uuid;

/// Generate an id for one physical transaction cycle, used in log output
pub fn new_cycle_id() -> String {
    format!("txn_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cycle_id() {
        let id = new_cycle_id();
        assert!(id.starts_with("txn_"), "cycle id should start with txn_");
        assert_ne!(id, new_cycle_id());
    }
}
