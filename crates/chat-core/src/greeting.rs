//! Private greeting sent to a connection on first join.

/// Builds the greeting from the names of the other occupants.
///
/// English only. Two or more names always take the `"A, B, and C"` form,
/// so two names read `"A, and B"`.
pub fn greeting<S: AsRef<str>>(others: &[S]) -> String {
    match others {
        [] => "Hi, nobody else is here yet".to_string(),
        [only] => format!("Say Hi to {}", only.as_ref()),
        [rest @ .., last] => {
            let head: Vec<&str> = rest.iter().map(|s| s.as_ref()).collect();
            format!("Say Hi to {}, and {}", head.join(", "), last.as_ref())
        }
    }
}
