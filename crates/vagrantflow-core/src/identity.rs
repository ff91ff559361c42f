//! Resource identity derived from machine names

/// Leading token of every resource id.
pub const ID_PREFIX: &str = "vagrant";

/// Separator between the prefix and each machine name.
pub const ID_SEPARATOR: &str = ":";

/// Build the resource id from the machine names reported by `vagrant up`.
///
/// Names are sorted first, so the same set of machines always yields the
/// same id. An empty set yields just [`ID_PREFIX`].
pub fn build_id<I, S>(machine_names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = machine_names
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect();
    names.sort();

    let mut keys = Vec::with_capacity(names.len() + 1);
    keys.push(ID_PREFIX.to_string());
    keys.extend(names);
    keys.join(ID_SEPARATOR)
}
