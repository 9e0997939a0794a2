//! Functions installed into every compiled template.

use minijinja::Environment;
use minijinja::value::{Rest, Value, ValueKind};

pub fn install(env: &mut Environment<'static>) {
    env.add_function("equals", equals_fn);
}

// `equals(x, a, b, ...)` in templates; false when called without arguments.
fn equals_fn(args: Rest<Value>) -> bool {
    match args.split_first() {
        Some((value, candidates)) => equals(value, candidates),
        None => false,
    }
}

/// Reports whether `value` equals any of `candidates`.
///
/// Scalars compare by value (integers and floats against each other);
/// bytes, sequences and maps compare element by element. Values of
/// different kinds are never equal.
pub fn equals(value: &Value, candidates: &[Value]) -> bool {
    candidates.iter().any(|candidate| same(value, candidate))
}

fn same(a: &Value, b: &Value) -> bool {
    match (a.kind(), b.kind()) {
        (ValueKind::Undefined, ValueKind::Undefined) | (ValueKind::None, ValueKind::None) => true,
        (ValueKind::Bool, ValueKind::Bool) | (ValueKind::Number, ValueKind::Number) => a == b,
        (ValueKind::String, ValueKind::String) => a.as_str() == b.as_str(),
        (ValueKind::Bytes, ValueKind::Bytes) => a.as_bytes() == b.as_bytes(),
        (ValueKind::Seq, ValueKind::Seq) | (ValueKind::Iterable, ValueKind::Iterable) => {
            same_seq(a, b)
        }
        (ValueKind::Map, ValueKind::Map) => same_map(a, b),
        _ => false,
    }
}

fn same_seq(a: &Value, b: &Value) -> bool {
    let (Ok(xs), Ok(ys)) = (a.try_iter(), b.try_iter()) else {
        return false;
    };
    let xs: Vec<Value> = xs.collect();
    let ys: Vec<Value> = ys.collect();
    xs.len() == ys.len() && xs.iter().zip(&ys).all(|(x, y)| same(x, y))
}

fn same_map(a: &Value, b: &Value) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let Ok(keys) = a.try_iter() else {
        return false;
    };
    for key in keys {
        let (Ok(x), Ok(y)) = (a.get_item(&key), b.get_item(&key)) else {
            return false;
        };
        if y.is_undefined() || !same(&x, &y) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use std::collections::BTreeMap;

    fn v<T: Into<Value>>(x: T) -> Value {
        x.into()
    }

    #[test]
    fn scalars() {
        assert!(equals(&v(5), &[v(3), v(5), v(7)]));
        assert!(!equals(&v("a"), &[v("b")]));
        assert!(equals(&v("home"), &[v("galleries"), v("home")]));
        assert!(equals(&v(2), &[v(2.0)]));
        assert!(!equals(&v(true), &[v(1)]));
        assert!(!equals(&v("5"), &[v(5)]));
        assert!(!equals(&v(5), &[]));
    }

    #[test]
    fn bytes_compare_structurally() {
        assert!(equals(&Value::from_bytes(vec![1]), &[Value::from_bytes(vec![1])]));
        assert!(!equals(&Value::from_bytes(vec![1]), &[Value::from_bytes(vec![1, 2])]));
    }

    #[test]
    fn composites_compare_structurally() {
        assert!(equals(&v(vec![1, 2]), &[v(vec![1]), v(vec![1, 2])]));
        assert!(!equals(&v(vec![1, 2]), &[v(vec![2, 1])]));

        let mut a = BTreeMap::new();
        a.insert("image", "a.jpg");
        let mut b = a.clone();
        assert!(equals(&Value::from_serialize(&a), &[Value::from_serialize(&b)]));
        b.insert("caption", "A");
        assert!(!equals(&Value::from_serialize(&a), &[Value::from_serialize(&b)]));
    }

    #[test]
    fn available_in_templates() {
        let mut env = Environment::new();
        install(&mut env);
        let out = env
            .render_str(
                "{% if equals(name, 'galleries', 'gallery') %}active{% endif %}|{{ equals() }}",
                context! { name => "gallery" },
            )
            .unwrap();
        assert_eq!(out, "active|false");
    }
}
