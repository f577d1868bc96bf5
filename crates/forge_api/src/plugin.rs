//! Plugin definitions.
//!
//! A plugin is pure data: default values plus optional contributions to the
//! infrastructure stacks, the machine roles, the Kubernetes components and the
//! PKI. The composition engine only ever reads these structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{ContentSpec, FileSpec};
use crate::values::Values;

/// A loaded plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plugin {
    pub metadata: PluginMetadata,
    #[serde(default)]
    pub spec: PluginSpec,
}

impl Plugin {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            metadata: PluginMetadata {
                name: name.into(),
                version: version.into(),
            },
            spec: PluginSpec::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Key under which the plugin is configured in a cluster file.
    ///
    /// `my-plugin` becomes `myPlugin`.
    pub fn setting_key(&self) -> String {
        to_lower_camel_case(&self.metadata.name)
    }

    /// Default values declared by the plugin.
    pub fn default_values(&self) -> &Values {
        &self.spec.cluster.values
    }

    pub fn stacks(&self) -> &Stacks {
        &self.spec.cluster.cloudformation.stacks
    }

    pub fn roles(&self) -> &MachineRoles {
        &self.spec.cluster.machine.roles
    }

    pub fn kubernetes(&self) -> &KubernetesSpec {
        &self.spec.cluster.kubernetes
    }
}

/// Plugin identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginMetadata {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PluginSpec {
    #[serde(default)]
    pub cluster: ClusterSpec,
}

/// Everything a plugin may contribute to a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default)]
    pub values: Values,
    #[serde(default)]
    pub cloudformation: CloudFormationSpec,
    #[serde(default)]
    pub kubernetes: KubernetesSpec,
    #[serde(default)]
    pub machine: MachineSpec,
    #[serde(default)]
    pub helm: HelmSpec,
    #[serde(default)]
    pub pki: PkiSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CloudFormationSpec {
    #[serde(default)]
    pub stacks: Stacks,
}

/// Per-layer stack contributions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stacks {
    #[serde(default)]
    pub root: StackSpec,
    #[serde(default)]
    pub network: StackSpec,
    #[serde(default)]
    pub etcd: StackSpec,
    #[serde(default)]
    pub control_plane: StackSpec,
    #[serde(default)]
    pub node_pool: StackSpec,
}

/// JSON fragments merged into one stack template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StackSpec {
    #[serde(default)]
    pub resources: ContentSpec,
    #[serde(default)]
    pub outputs: ContentSpec,
    #[serde(default)]
    pub tags: ContentSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MachineSpec {
    #[serde(default)]
    pub roles: MachineRoles,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MachineRoles {
    #[serde(default)]
    pub controller: RoleSpec,
    #[serde(default)]
    pub worker: RoleSpec,
    #[serde(default)]
    pub etcd: RoleSpec,
}

/// Contributions to one machine role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RoleSpec {
    #[serde(default)]
    pub files: Vec<FileSpec>,
    #[serde(default)]
    pub systemd: SystemdSpec,
    #[serde(default)]
    pub iam: IamSpec,
    #[serde(default)]
    pub kubelet: RoleKubeletSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SystemdSpec {
    #[serde(default)]
    pub units: Vec<SystemdUnitSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SystemdUnitSpec {
    pub name: String,
    #[serde(flatten)]
    pub content: ContentSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IamSpec {
    #[serde(default)]
    pub policy: IamPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IamPolicy {
    #[serde(default)]
    pub statements: Vec<IamPolicyStatement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IamPolicyStatement {
    pub effect: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

/// Kubelet settings contributed to one role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoleKubeletSpec {
    #[serde(default)]
    pub node_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub feature_gates: BTreeMap<String, String>,
    #[serde(default)]
    pub kubeconfig: String,
    #[serde(default)]
    pub mounts: Vec<ContainerVolumeMount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerVolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Kubernetes component contributions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesSpec {
    #[serde(default, rename = "apiserver", alias = "apiServer")]
    pub api_server: ApiServerSpec,
    #[serde(default)]
    pub controller_manager: ComponentSpec,
    #[serde(default)]
    pub kube_scheduler: ComponentSpec,
    #[serde(default)]
    pub kubelet: ComponentSpec,
    #[serde(default)]
    pub kube_proxy: KubeProxySpec,
    #[serde(default)]
    pub manifests: Vec<ManifestSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ApiServerSpec {
    #[serde(default)]
    pub flags: Vec<CommandLineFlag>,
    #[serde(default)]
    pub volumes: Vec<ApiServerVolume>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComponentSpec {
    #[serde(default)]
    pub flags: Vec<CommandLineFlag>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KubeProxySpec {
    #[serde(default)]
    pub config: Values,
}

/// A `--name=value` flag for a Kubernetes component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandLineFlag {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl CommandLineFlag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiServerVolume {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub write: bool,
}

/// A Kubernetes manifest installed on controllers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ManifestSpec {
    /// Defaults to the file name of `source.path`.
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub content: ContentSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HelmSpec {
    #[serde(default)]
    pub releases: Vec<HelmReleaseSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HelmReleaseSpec {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub values: Values,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PkiSpec {
    #[serde(default, alias = "keyPairs")]
    pub keypairs: Vec<KeyPairSpec>,
}

/// A request for a keypair signed by the cluster PKI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairSpec {
    pub name: String,
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    #[serde(default, alias = "dnsnames")]
    pub dns_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signer: String,
}

/// Plugins in load order.
///
/// The position of a plugin in this list decides which plugin wins when two
/// of them write the same key: later entries overwrite earlier ones. The order
/// is fixed when the list is built and never changes afterwards.
#[derive(Debug, Clone, Default)]
pub struct PluginList {
    plugins: Vec<Plugin>,
}

impl PluginList {
    /// Build a list whose load order is the order of `plugins`.
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self { plugins }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Plugin> {
        self.plugins.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// Load position of the named plugin.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl<'a> IntoIterator for &'a PluginList {
    type Item = &'a Plugin;
    type IntoIter = std::slice::Iter<'a, Plugin>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.iter()
    }
}

impl FromIterator<Plugin> for PluginList {
    fn from_iter<I: IntoIterator<Item = Plugin>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

pub(crate) fn to_lower_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '-' || c == '_' || c == ' ' {
            upper_next = !result.is_empty();
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }
    result
}
