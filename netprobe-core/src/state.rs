use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// État partagé entre handlers HTTP et tâches de fond (un seul mutex par objet)
pub type Shared<T> = Arc<Mutex<T>>;

/// Table clé → enregistrement derrière un seul mutex
pub type SharedMap<K, V> = Shared<HashMap<K, V>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}
