//! Human-friendly type names for diagnostics.
//!
//! `std::any::type_name` returns fully qualified paths such as
//! `my_app::verbs::AddVerb` or `alloc::sync::Arc<dyn my_app::Base>`. Error
//! messages read better with the module paths removed, so `readable` turns
//! those into `AddVerb` and `Arc<dyn Base>`.

/// Readable name of `T` with every module path stripped.
pub fn readable_type_name<T: ?Sized>() -> String {
    readable(std::any::type_name::<T>())
}

/// Strips module paths from a type name produced by `std::any::type_name`.
///
/// Generic arguments, tuples, references and trait objects keep their
/// structure; only the `a::b::` prefixes of each path segment are removed.
pub fn readable(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();

    for ch in full.chars() {
        match ch {
            '<' | '>' | ',' | '(' | ')' | '[' | ']' | '&' | ';' | ' ' | '*' => {
                out.push_str(last_path_segment(&segment));
                segment.clear();
                out.push(ch);
            }
            _ => segment.push(ch),
        }
    }
    out.push_str(last_path_segment(&segment));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
