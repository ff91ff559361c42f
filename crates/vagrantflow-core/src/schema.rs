//! Attribute descriptions of the `vm` resource

/// Description of one resource attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub default: Option<&'static str>,
    pub deprecated: Option<&'static str>,
    /// Set by vagrantflow rather than declared
    pub computed: bool,
    /// Changing the value destroys and recreates the resource
    pub force_new: bool,
}

impl AttributeSchema {
    const fn declared(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            default: None,
            deprecated: None,
            computed: false,
            force_new: false,
        }
    }

    const fn computed(name: &'static str, description: &'static str) -> Self {
        Self {
            computed: true,
            ..Self::declared(name, description)
        }
    }

    const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    const fn forces_new(mut self) -> Self {
        self.force_new = true;
        self
    }
}

/// Every attribute of the `vm` resource, declared ones first
pub const RESOURCE_ATTRIBUTES: &[AttributeSchema] = &[
    AttributeSchema::declared(
        "name",
        "Name of the Vagrant resource. Forces resource to destroy/recreate if changed.",
    )
    .with_default("vagrantbox")
    .forces_new(),
    AttributeSchema::declared(
        "vagrantfile_dir",
        "Path to the directory where the Vagrantfile can be found.",
    )
    .with_default("."),
    AttributeSchema::declared("env", "Environment variables to pass to the Vagrantfile."),
    AttributeSchema::declared(
        "get_ports",
        "Whether or not to retrieve forwarded port information. See `ports`.",
    )
    .with_default("false"),
    AttributeSchema::declared(
        "timeouts",
        "Seconds each of create, read, update and delete may run before vagrant is killed. Zero or unset means no limit.",
    ),
    AttributeSchema::computed(
        "machine_names",
        "Names of the vagrant machines from the Vagrantfile. Names are in the same order as ssh_config.",
    ),
    AttributeSchema::computed("ssh_config", "SSH connection information."),
    AttributeSchema::computed(
        "ports",
        "Forwarded ports per machine. Only set if `get_ports` is true.",
    ),
];

/// Render an attribute's description, including its default and deprecation notice.
pub fn describe(attribute: &AttributeSchema) -> String {
    let mut description = attribute.description.to_string();
    if let Some(default) = attribute.default {
        description.push_str(&format!(" Defaults to `{}`.", default));
    }
    if let Some(deprecated) = attribute.deprecated {
        description.push(' ');
        description.push_str(deprecated);
    }
    description
}
