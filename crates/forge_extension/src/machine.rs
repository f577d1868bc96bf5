//! Aggregation of machine role payloads.
//!
//! Every role collects files, systemd units, IAM statements, archived binary
//! files and configuration sets. Worker and controller nodes additionally
//! collect kubelet settings, and the controller collects control-plane
//! component settings, Kubernetes manifests and Helm releases.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::Serialize;
use serde_json::{json, Map, Value};

use forge_api::{
    ApiServerVolume, CommandLineFlag, ContainerVolumeMount, ContentKind, FileSpec,
    IamPolicyStatement, Plugin, RoleSpec, Values,
};
use forge_templates::{Classified, ContentResolver, RenderContext};

use crate::error::{ExtensionResult, PluginError};
use crate::extension::ClusterExtension;

/// Directory on machines that receives plugin-generated files.
pub const PLUGIN_FILES_ROOT: &str = "/srv/kubeforge/plugins";

const MANIFEST_PERMISSIONS: u32 = 0o644;

/// A file written to a machine with fully static content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomFile {
    pub path: String,
    pub permissions: u32,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

/// A systemd unit installed and started on a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemdUnit {
    pub name: String,
    pub command: String,
    pub content: String,
    pub enable: bool,
    pub runtime: bool,
}

impl SystemdUnit {
    fn started(name: impl Into<String>, content: String) -> Self {
        Self {
            name: name.into(),
            command: "start".to_string(),
            content,
            enable: true,
            runtime: false,
        }
    }
}

/// Binary content shipped in the plugin archive instead of inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedFile {
    pub plugin: String,
    #[serde(flatten)]
    pub file: FileSpec,
}

/// A file on a controller node referenced by other artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFile {
    pub path: String,
    pub content: String,
}

/// The two files describing one Helm release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmReleaseFileset {
    pub values_file: RemoteFile,
    pub release_file: RemoteFile,
}

/// Payload shared by every machine role.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachinePayload {
    pub files: Vec<CustomFile>,
    pub units: Vec<SystemdUnit>,
    pub iam_policy_statements: Vec<IamPolicyStatement>,
    pub archived_files: Vec<ArchivedFile>,
    /// `{plugin: {"files": {path: {"content": expression}}}}`
    pub config_sets: BTreeMap<String, Value>,
}

/// Kubelet settings shared by worker and controller nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeletPayload {
    pub node_labels: BTreeMap<String, String>,
    pub feature_gates: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
    pub kubelet_volume_mounts: Vec<ContainerVolumeMount>,
    pub kubelet_flags: Vec<CommandLineFlag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerExtension {
    #[serde(flatten)]
    pub machine: MachinePayload,
    #[serde(flatten)]
    pub kubelet: KubeletPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerExtension {
    #[serde(flatten)]
    pub machine: MachinePayload,
    #[serde(flatten)]
    pub kubelet: KubeletPayload,
    pub api_server_flags: Vec<CommandLineFlag>,
    pub api_server_volumes: Vec<ApiServerVolume>,
    pub controller_manager_flags: Vec<CommandLineFlag>,
    pub kube_scheduler_flags: Vec<CommandLineFlag>,
    pub kube_proxy_config: Values,
    pub kubernetes_manifest_files: Vec<RemoteFile>,
    pub helm_release_filesets: Vec<HelmReleaseFileset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtcdExtension {
    #[serde(flatten)]
    pub machine: MachinePayload,
}

/// Where a plugin's generated file for `name` lives on a machine.
///
/// `name` must stay inside the plugin's directory: absolute names and `..`
/// components are rejected.
pub fn plugin_file_path(plugin: &str, name: &str) -> Result<String, PluginError> {
    let escapes = Path::new(name)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if name.is_empty() || escapes {
        return Err(PluginError::FileOutsidePlugin {
            name: name.to_string(),
        });
    }
    Ok(format!("{}/{}/{}", PLUGIN_FILES_ROOT, plugin, name))
}

impl ClusterExtension<'_> {
    pub fn worker(&self, ctx: &RenderContext) -> ExtensionResult<WorkerExtension> {
        let mut out = WorkerExtension::default();

        self.for_each_enabled("worker", |plugin, config| {
            let values = self.plugin_values(plugin, config, ctx)?;
            let resolver = self.resolver(plugin, ctx, &values);
            let role = &plugin.roles().worker;

            let mut count = self.machine_role(&resolver, plugin, role, &mut out.machine)?;
            count += self.kubelet_role(&resolver, plugin, role, &mut out.kubelet)?;
            Ok(count)
        })?;

        Ok(out)
    }

    pub fn controller(&self, ctx: &RenderContext) -> ExtensionResult<ControllerExtension> {
        let mut out = ControllerExtension::default();

        self.for_each_enabled("controller", |plugin, config| {
            let values = self.plugin_values(plugin, config, ctx)?;
            let resolver = self.resolver(plugin, ctx, &values);
            let role = &plugin.roles().controller;
            let k8s = plugin.kubernetes();

            let mut count = self.machine_role(&resolver, plugin, role, &mut out.machine)?;
            count += self.kubelet_role(&resolver, plugin, role, &mut out.kubelet)?;
            count += render_flags(
                &resolver,
                "apiserver",
                &k8s.api_server.flags,
                &mut out.api_server_flags,
            )?;
            count += render_flags(
                &resolver,
                "controllerManager",
                &k8s.controller_manager.flags,
                &mut out.controller_manager_flags,
            )?;
            count += render_flags(
                &resolver,
                "kubeScheduler",
                &k8s.kube_scheduler.flags,
                &mut out.kube_scheduler_flags,
            )?;

            out.api_server_volumes
                .extend(k8s.api_server.volumes.iter().cloned());
            out.kube_proxy_config
                .extend(k8s.kube_proxy.config.clone());
            count += k8s.api_server.volumes.len() + k8s.kube_proxy.config.len();

            count += self.manifests(&resolver, plugin, &mut out)?;
            count += self.helm_releases(plugin, &mut out)?;
            Ok(count)
        })?;

        Ok(out)
    }

    pub fn etcd(&self, ctx: &RenderContext) -> ExtensionResult<EtcdExtension> {
        let mut out = EtcdExtension::default();

        self.for_each_enabled("etcd", |plugin, config| {
            let values = self.plugin_values(plugin, config, ctx)?;
            let resolver = self.resolver(plugin, ctx, &values);
            self.machine_role(&resolver, plugin, &plugin.roles().etcd, &mut out.machine)
        })?;

        Ok(out)
    }

    /// Units, files and IAM statements of one role.
    fn machine_role(
        &self,
        resolver: &ContentResolver<'_>,
        plugin: &Plugin,
        role: &RoleSpec,
        out: &mut MachinePayload,
    ) -> Result<usize, PluginError> {
        let mut count = 0;

        for unit in &role.systemd.units {
            let what = format!("systemd.units[{}]", unit.name);
            let content = resolver.text(&unit.content, &what)?;
            self.observer().resolved(plugin.name(), &what);
            out.units.push(SystemdUnit::started(&unit.name, content));
            count += 1;
        }

        let mut deferred = Map::new();
        for file in &role.files {
            let what = format!("files[{}]", file.path);
            if file.content.is_binary() {
                out.archived_files.push(ArchivedFile {
                    plugin: plugin.name().to_string(),
                    file: file.clone(),
                });
                count += 1;
                continue;
            }

            let text = resolver.text(&file.content, &what)?;
            match self.classify(&text, file.content.kind)? {
                Classified::Literal(content) => out.files.push(CustomFile {
                    path: file.path.clone(),
                    permissions: file.permissions,
                    content,
                    kind: file.content.kind,
                }),
                Classified::Deferred(expr) => {
                    deferred.insert(file.path.clone(), json!({ "content": expr }));
                }
            }
            self.observer().resolved(plugin.name(), &what);
            count += 1;
        }
        out.config_sets
            .insert(plugin.name().to_string(), json!({ "files": deferred }));

        out.iam_policy_statements
            .extend(role.iam.policy.statements.iter().cloned());
        count += role.iam.policy.statements.len();

        Ok(count)
    }

    /// Kubelet labels, gates, kubeconfig, mounts and flags of one role.
    fn kubelet_role(
        &self,
        resolver: &ContentResolver<'_>,
        plugin: &Plugin,
        role: &RoleSpec,
        out: &mut KubeletPayload,
    ) -> Result<usize, PluginError> {
        let kubelet = &role.kubelet;

        out.node_labels.extend(kubelet.node_labels.clone());
        out.feature_gates.extend(kubelet.feature_gates.clone());
        if !kubelet.kubeconfig.is_empty() {
            out.kubeconfig = Some(resolver.string(&kubelet.kubeconfig, "kubelet.kubeconfig")?);
        }
        out.kubelet_volume_mounts
            .extend(kubelet.mounts.iter().cloned());

        let flags = render_flags(
            resolver,
            "kubelet",
            &plugin.kubernetes().kubelet.flags,
            &mut out.kubelet_flags,
        )?;

        Ok(kubelet.node_labels.len()
            + kubelet.feature_gates.len()
            + kubelet.mounts.len()
            + usize::from(!kubelet.kubeconfig.is_empty())
            + flags)
    }

    /// Kubernetes manifests, inlined when static and config-set backed otherwise.
    fn manifests(
        &self,
        resolver: &ContentResolver<'_>,
        plugin: &Plugin,
        out: &mut ControllerExtension,
    ) -> Result<usize, PluginError> {
        let manifests = &plugin.kubernetes().manifests;
        let mut deferred = Map::new();

        for (index, manifest) in manifests.iter().enumerate() {
            let name = if manifest.name.is_empty() {
                manifest
                    .content
                    .source_path()
                    .and_then(|p| p.rsplit('/').next())
                    .filter(|n| !n.is_empty())
                    .ok_or(PluginError::MissingManifestName { index })?
            } else {
                manifest.name.as_str()
            };
            let path = plugin_file_path(plugin.name(), name)?;
            let what = format!("kubernetes.manifests[{}]", name);

            let text = resolver.text(&manifest.content, &what)?;
            match self.classify(&text, manifest.content.kind)? {
                Classified::Literal(content) => {
                    out.machine.files.push(CustomFile {
                        path: path.clone(),
                        permissions: MANIFEST_PERMISSIONS,
                        content: content.clone(),
                        kind: ContentKind::Manifest,
                    });
                    out.kubernetes_manifest_files
                        .push(RemoteFile { path, content });
                }
                Classified::Deferred(expr) => {
                    deferred.insert(path.clone(), json!({ "content": expr }));
                    out.kubernetes_manifest_files.push(RemoteFile {
                        path,
                        content: String::new(),
                    });
                }
            }
            self.observer().resolved(plugin.name(), &what);
        }

        if !deferred.is_empty() {
            let entry = out
                .machine
                .config_sets
                .entry(plugin.name().to_string())
                .or_insert_with(|| json!({ "files": {} }));
            if let Some(files) = entry.get_mut("files").and_then(Value::as_object_mut) {
                files.extend(deferred);
            }
        }

        Ok(manifests.len())
    }

    /// Values and descriptor files for each Helm release.
    fn helm_releases(
        &self,
        plugin: &Plugin,
        out: &mut ControllerExtension,
    ) -> Result<usize, PluginError> {
        let releases = &plugin.spec.cluster.helm.releases;

        for release in releases {
            let dir = plugin_file_path(
                plugin.name(),
                &format!("helm/releases/{}", release.name),
            )?;
            let values_file = RemoteFile {
                path: format!("{}/values.yaml", dir),
                content: serde_json::to_string(&release.values)?,
            };
            let descriptor = json!({
                "chart": {
                    "name": release.name,
                    "version": release.version,
                },
                "values": {
                    "file": values_file.path,
                },
            });
            let release_file = RemoteFile {
                path: format!("{}/release.json", dir),
                content: serde_json::to_string(&descriptor)?,
            };

            self.observer()
                .resolved(plugin.name(), &format!("helm.releases[{}]", release.name));
            out.helm_release_filesets.push(HelmReleaseFileset {
                values_file,
                release_file,
            });
        }

        Ok(releases.len())
    }
}

fn render_flags(
    resolver: &ContentResolver<'_>,
    component: &str,
    flags: &[CommandLineFlag],
    out: &mut Vec<CommandLineFlag>,
) -> Result<usize, PluginError> {
    for flag in flags {
        let what = format!("kubernetes.{}.flags[{}]", component, flag.name);
        out.push(CommandLineFlag::new(
            flag.name.clone(),
            resolver.string(&flag.value, &what)?,
        ));
    }
    Ok(flags.len())
}
