// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deduplicating value bindings.
//!
//! A [`Binding`] is a small fan-in/fan-out node between raw channel updates
//! and derived outputs: it stores the current value of each named input and
//! reruns its combine function over the full snapshot only when an input
//! actually changed. Consumers attach one binding per derived output.
//!
//! [`MappedBinding`] and [`CombinedBinding`] cover the two common shapes —
//! a single mapped passthrough and a two-input numeric combiner — purely in
//! terms of [`Binding::update_any`].

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

type CombineFn = dyn Fn(&HashMap<String, Value>) + Send + Sync;
type SinkFn = dyn Fn(&Value) + Send + Sync;
type NumericSinkFn = dyn Fn(f64) + Send + Sync;

/// A multi-input, change-detecting transform node.
///
/// # Examples
///
/// ```
/// use emsor_lib::Binding;
/// use serde_json::{Value, json};
/// use std::collections::HashMap;
///
/// let initial: HashMap<String, Value> =
///     [("soc".to_string(), Value::Null)].into_iter().collect();
///
/// let binding = Binding::new(initial, |values| {
///     println!("battery level: {}", values["soc"]);
/// });
///
/// binding.update_any("soc", json!(42)); // prints
/// binding.update_any("soc", json!(42)); // deduplicated, no output
/// ```
pub struct Binding {
    values: Mutex<HashMap<String, Value>>,
    combine: Box<CombineFn>,
}

impl Binding {
    /// Creates a binding over the given initial input snapshot.
    ///
    /// The combine function is not invoked here; outputs first fire when an
    /// input diverges from its initial value.
    pub fn new<F>(initial: HashMap<String, Value>, combine: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) + Send + Sync + 'static,
    {
        Self {
            values: Mutex::new(initial),
            combine: Box::new(combine),
        }
    }

    /// Stores a new value for the named input and reruns the combine
    /// function over the whole snapshot.
    ///
    /// A value equal to the currently stored one is a no-op: the combine
    /// function is not invoked.
    pub fn update_any(&self, name: &str, value: Value) {
        let mut values = self.values.lock();
        if values.get(name) == Some(&value) {
            return;
        }
        values.insert(name.to_string(), value);
        (self.combine)(&values);
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("inputs", &self.values.lock().len())
            .finish()
    }
}

/// Single-input passthrough with an optional mapping step.
///
/// The mapper runs before storage, so deduplication happens on the mapped
/// value: two raw inputs that map to the same output trigger the sink once.
pub struct MappedBinding {
    inner: Binding,
    mapper: Box<dyn Fn(Value) -> Value + Send + Sync>,
}

impl MappedBinding {
    /// Creates a passthrough binding without a mapping step.
    pub fn new<S>(initial: Value, sink: S) -> Self
    where
        S: Fn(&Value) + Send + Sync + 'static,
    {
        Self::with_mapper(initial, sink, |value| value)
    }

    /// Creates a binding that maps each input before storing it.
    pub fn with_mapper<S, M>(initial: Value, sink: S, mapper: M) -> Self
    where
        S: Fn(&Value) + Send + Sync + 'static,
        M: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let initial = [("v".to_string(), initial)].into_iter().collect();
        Self {
            inner: Binding::new(initial, move |values| {
                if let Some(value) = values.get("v") {
                    sink(value);
                }
            }),
            mapper: Box::new(mapper),
        }
    }

    /// Feeds a new raw value through the mapper into the binding.
    pub fn update(&self, value: Value) {
        self.inner.update_any("v", (self.mapper)(value));
    }
}

/// Two-input numeric combiner.
///
/// The default mapper is the sum of both inputs; a custom mapper covers
/// derived quantities such as `-(a + b)`.
pub struct CombinedBinding {
    inner: Binding,
}

impl CombinedBinding {
    /// Creates a combiner that pushes `first + second`.
    pub fn new<S>(first: f64, second: f64, sink: S) -> Self
    where
        S: Fn(f64) + Send + Sync + 'static,
    {
        Self::with_mapper(first, second, sink, |a, b| a + b)
    }

    /// Creates a combiner with a custom mapping over both inputs.
    pub fn with_mapper<S, M>(first: f64, second: f64, sink: S, mapper: M) -> Self
    where
        S: Fn(f64) + Send + Sync + 'static,
        M: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        let initial = [
            ("v1".to_string(), Value::from(first)),
            ("v2".to_string(), Value::from(second)),
        ]
        .into_iter()
        .collect();

        Self {
            inner: Binding::new(initial, move |values| {
                let (Some(a), Some(b)) = (
                    values.get("v1").and_then(Value::as_f64),
                    values.get("v2").and_then(Value::as_f64),
                ) else {
                    return;
                };
                sink(mapper(a, b));
            }),
        }
    }

    /// Updates the first input.
    pub fn update_first(&self, value: f64) {
        self.inner.update_any("v1", Value::from(value));
    }

    /// Updates the second input.
    pub fn update_second(&self, value: f64) {
        self.inner.update_any("v2", Value::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn counting_sink() -> (Arc<Mutex<Vec<Value>>>, impl Fn(&Value) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        (seen, move |value: &Value| {
            seen_clone.lock().push(value.clone());
        })
    }

    #[test]
    fn repeated_value_triggers_combine_at_most_once() {
        let calls = Arc::new(Mutex::new(0_u32));
        let calls_clone = Arc::clone(&calls);

        let initial = [("soc".to_string(), Value::Null)].into_iter().collect();
        let binding = Binding::new(initial, move |_values| {
            *calls_clone.lock() += 1;
        });

        binding.update_any("soc", json!(42));
        binding.update_any("soc", json!(42));

        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn combine_sees_full_snapshot() {
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let snapshots_clone = Arc::clone(&snapshots);

        let initial = [
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(2)),
        ]
        .into_iter()
        .collect();
        let binding = Binding::new(initial, move |values: &HashMap<String, Value>| {
            snapshots_clone.lock().push((values["a"].clone(), values["b"].clone()));
        });

        binding.update_any("a", json!(10));

        let snapshots = snapshots.lock();
        assert_eq!(snapshots.len(), 1);
        // Untouched inputs keep their current value in the snapshot.
        assert_eq!(snapshots[0], (json!(10), json!(2)));
    }

    #[test]
    fn update_to_initial_value_is_a_noop() {
        let calls = Arc::new(Mutex::new(0_u32));
        let calls_clone = Arc::clone(&calls);

        let initial = [("v".to_string(), json!(0))].into_iter().collect();
        let binding = Binding::new(initial, move |_| {
            *calls_clone.lock() += 1;
        });

        binding.update_any("v", json!(0));
        assert_eq!(*calls.lock(), 0);

        binding.update_any("v", json!(1));
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn mapped_binding_applies_mapper_before_dedup() {
        let (seen, sink) = counting_sink();
        let binding =
            MappedBinding::with_mapper(Value::Null, sink, |value| {
                // Fault state: anything below 2 is "no fault".
                let level = value.as_i64().unwrap_or(0);
                json!(i64::from(level >= 2))
            });

        binding.update(json!(0));
        binding.update(json!(1)); // maps to the same output, deduplicated
        binding.update(json!(3));

        let seen = seen.lock();
        assert_eq!(seen.as_slice(), [json!(0), json!(1)]);
    }

    #[test]
    fn combined_binding_defaults_to_sum() {
        let outputs = Arc::new(Mutex::new(Vec::new()));
        let outputs_clone = Arc::clone(&outputs);

        let binding = CombinedBinding::new(0.0, 0.0, move |value| {
            outputs_clone.lock().push(value);
        });

        binding.update_first(100.0);
        binding.update_second(-30.0);

        let outputs = outputs.lock();
        assert_eq!(outputs.as_slice(), [100.0, 70.0]);
    }

    #[test]
    fn combined_binding_custom_mapper() {
        let outputs = Arc::new(Mutex::new(Vec::new()));
        let outputs_clone = Arc::clone(&outputs);

        // Consumption = -(production + grid feed-in)
        let binding = CombinedBinding::with_mapper(0.0, 0.0, move |value| {
            outputs_clone.lock().push(value);
        }, |a, b| -(a + b));

        binding.update_first(250.0);

        assert_eq!(outputs.lock().as_slice(), [-250.0]);
    }

    #[test]
    fn combined_binding_deduplicates_per_input() {
        let calls = Arc::new(Mutex::new(0_u32));
        let calls_clone = Arc::clone(&calls);

        let binding = CombinedBinding::new(0.0, 0.0, move |_| {
            *calls_clone.lock() += 1;
        });

        binding.update_first(5.0);
        binding.update_first(5.0);
        binding.update_second(5.0);

        assert_eq!(*calls.lock(), 2);
    }
}
