use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use forge_api::{ClusterModel, ContentKind, Plugin, PluginConfigs, PluginList, PluginLoader, PLUGINS_DIR};
use forge_extension::{
    ClusterExtension, CompositionObserver, Enablement, StackLayer, WorkerExtension,
};
use forge_templates::{AssetLoader, RenderContext};
use serde_json::json;
use tempfile::{tempdir, TempDir};

const QUEUE_PLUGIN: &str = r#"
metadata:
  name: queue
  version: 0.1.0
spec:
  cluster:
    values:
      queue:
        name: bar
    cloudformation:
      stacks:
        root:
          resources:
            content: '{"Queue": {"Type": "AWS::SQS::Queue", "Properties": {"QueueName": "{{ Values.queue.name }}"}}}'
        nodePool:
          resources:
            content: '{"PoolQueue": {"Type": "AWS::SQS::Queue", "Properties": {"QueueName": "{{ Values.queue.name }}"}}}'
          outputs:
            content: '{"PoolQueueArn": {"Value": {"Fn::GetAtt": ["PoolQueue", "Arn"]}}}'
    machine:
      roles:
        controller:
          files:
          - path: /etc/queue/static
            permissions: 0600
            content: static-only
          - path: /etc/queue/secret
            type: credential
            content: 'token={"Ref": "NotAnExpression"}'
        worker:
          files:
          - path: /etc/queue/url
            content: 'url={"Ref": "PoolQueue"}'
          - path: /opt/bin/queue-agent
            type: binary
            source:
              path: bin/queue-agent
          systemd:
            units:
            - name: queue-agent.service
              source:
                path: units/queue-agent.service
          iam:
            policy:
              statements:
              - effect: Allow
                actions: ["sqs:ReceiveMessage"]
                resources: ["*"]
          kubelet:
            nodeLabels:
              role: queue
        etcd:
          files:
          - path: /etc/queue/etcd
            content: etcd-{{ clusterName }}
    kubernetes:
      kubelet:
        flags:
        - name: node-status-update-frequency
          value: 4s
    pki:
      keypairs:
      - name: queue-client
        commonName: "{{ Values.queue.name }}"
"#;

const LABEL_PLUGIN: &str = r#"
metadata:
  name: labels
  version: 0.1.0
spec:
  cluster:
    machine:
      roles:
        worker:
          kubelet:
            nodeLabels:
              role: labels
              team: infra
"#;

const CLUSTER: &str = r#"
clusterName: demo
region: us-west-2
plugins:
  queue:
    enabled: true
  labels:
    enabled: true
worker:
  nodePools:
  - name: pool1
    plugins:
      queue:
        enabled: true
        queue:
          name: baz
"#;

fn write(root: &Path, plugin: &str, rel: &str, data: &str) {
    let path = root.join(PLUGINS_DIR).join(plugin).join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

fn setup() -> (TempDir, PluginList, ClusterModel) {
    let temp = tempdir().unwrap();
    write(temp.path(), "queue", "plugin.yaml", QUEUE_PLUGIN);
    write(
        temp.path(),
        "queue",
        "units/queue-agent.service",
        "[Service]\nEnvironment=QUEUE={{ Values.queue.name }}\n",
    );
    write(temp.path(), "labels", "plugin.yaml", LABEL_PLUGIN);

    let plugins = PluginLoader::new(temp.path()).load_all().unwrap();
    let cluster = ClusterModel::from_yaml(CLUSTER).unwrap();
    (temp, plugins, cluster)
}

fn worker_for(
    plugins: &PluginList,
    enablement: &Enablement,
    root: &Path,
    ctx: &RenderContext,
) -> WorkerExtension {
    let loader = AssetLoader::new(root);
    let ext = ClusterExtension::new(plugins, enablement, &loader);
    ext.worker(ctx).unwrap()
}

#[test]
fn test_node_pool_override_vs_cluster_stack() {
    let (temp, plugins, cluster) = setup();
    let loader = AssetLoader::new(temp.path());
    let ctx = RenderContext::from_value(cluster.render_context());

    let cluster_scope = Enablement::cluster(&cluster.plugins);
    let ext = ClusterExtension::new(&plugins, &cluster_scope, &loader);
    let root = ext.root_stack(&ctx, &ctx).unwrap();
    assert_eq!(root.resources["Queue"]["Properties"]["QueueName"], "bar");

    let pool = cluster.node_pool("pool1").unwrap();
    let pool_scope = Enablement::node_pool(&cluster.plugins, &pool.plugins).unwrap();
    let pool_ctx = RenderContext::from_value(cluster.node_pool_context(pool));
    let ext = ClusterExtension::new(&plugins, &pool_scope, &loader);
    let stack = ext.node_pool_stack(&pool_ctx, &pool_ctx).unwrap();

    assert_eq!(stack.resources["PoolQueue"]["Properties"]["QueueName"], "baz");
    assert_eq!(
        stack.outputs["PoolQueueArn"]["Value"],
        json!({"Fn::GetAtt": ["PoolQueue", "Arn"]})
    );
}

#[test]
fn test_controller_static_file_and_credential() {
    let (temp, plugins, cluster) = setup();
    let loader = AssetLoader::new(temp.path());
    let enablement = Enablement::cluster(&cluster.plugins);
    let ext = ClusterExtension::new(&plugins, &enablement, &loader);

    let ctrl = ext
        .controller(&RenderContext::from_value(cluster.render_context()))
        .unwrap();

    let static_file = &ctrl.machine.files[0];
    assert_eq!(static_file.path, "/etc/queue/static");
    assert_eq!(static_file.permissions, 0o600);
    assert_eq!(static_file.content, "static-only");

    let secret = &ctrl.machine.files[1];
    assert_eq!(secret.kind, ContentKind::Credential);
    assert_eq!(secret.content, r#"token={"Ref": "NotAnExpression"}"#);
    assert_eq!(ctrl.machine.config_sets["queue"], json!({"files": {}}));
}

#[test]
fn test_worker_payload() {
    let (temp, plugins, cluster) = setup();
    let enablement = Enablement::cluster(&cluster.plugins);
    let ctx = RenderContext::from_value(cluster.render_context());
    let worker = worker_for(&plugins, &enablement, temp.path(), &ctx);

    // "labels" loads before "queue", so the queue plugin's label wins.
    assert_eq!(worker.kubelet.node_labels["role"], "queue");
    assert_eq!(worker.kubelet.node_labels["team"], "infra");

    assert_eq!(
        worker.machine.units[0].content,
        "[Service]\nEnvironment=QUEUE=bar\n"
    );
    assert_eq!(worker.machine.archived_files.len(), 1);
    assert_eq!(worker.machine.archived_files[0].file.path, "/opt/bin/queue-agent");
    assert!(worker.machine.files.is_empty());
    assert_eq!(
        worker.machine.config_sets["queue"]["files"]["/etc/queue/url"]["content"],
        json!({"Fn::Join": ["", ["url=", {"Ref": "PoolQueue"}]]})
    );
    assert_eq!(worker.machine.iam_policy_statements[0].actions, vec!["sqs:ReceiveMessage"]);
    assert_eq!(worker.kubelet.kubelet_flags[0].value, "4s");
}

#[test]
fn test_disabled_plugin_contributes_nothing() {
    let (temp, plugins, mut cluster) = setup();
    cluster.plugins = cluster
        .plugins
        .merge(&serde_yaml::from_str("queue:\n  enabled: false\n").unwrap())
        .unwrap();

    let loader = AssetLoader::new(temp.path());
    let enablement = Enablement::cluster(&cluster.plugins);
    let ext = ClusterExtension::new(&plugins, &enablement, &loader);
    let ctx = RenderContext::from_value(cluster.render_context());

    for layer in StackLayer::ALL {
        assert!(ext.stack(layer, &ctx, &ctx).unwrap().is_empty(), "{layer}");
    }
    let ctrl = ext.controller(&ctx).unwrap();
    assert!(ctrl.machine.files.is_empty());
    assert!(!ctrl.machine.config_sets.contains_key("queue"));

    let worker = ext.worker(&ctx).unwrap();
    assert_eq!(worker.kubelet.node_labels["role"], "labels");
    assert!(worker.machine.units.is_empty());
    assert!(worker.kubelet.kubelet_flags.is_empty());

    assert!(ext.etcd(&ctx).unwrap().machine.files.is_empty());
    assert!(ext.key_pair_specs(&ctx).unwrap().is_empty());
}

#[test]
fn test_node_pool_disable_by_setting_key() {
    let mut plugin = Plugin::new("my-plugin", "0.1.0");
    plugin
        .spec
        .cluster
        .machine
        .roles
        .worker
        .kubelet
        .node_labels
        .insert("x".to_string(), "y".to_string());
    let plugins = PluginList::new(vec![plugin]);

    let cluster: PluginConfigs = serde_yaml::from_str("my-plugin:\n  enabled: true\n").unwrap();
    let pool: PluginConfigs = serde_yaml::from_str("myPlugin:\n  enabled: false\n").unwrap();
    let ctx = RenderContext::new();

    let cluster_scope = Enablement::cluster(&cluster);
    let worker = worker_for(&plugins, &cluster_scope, Path::new("/unused"), &ctx);
    assert_eq!(worker.kubelet.node_labels["x"], "y");

    let pool_scope = Enablement::node_pool(&cluster, &pool).unwrap();
    let worker = worker_for(&plugins, &pool_scope, Path::new("/unused"), &ctx);
    assert!(worker.kubelet.node_labels.is_empty());
}

#[test]
fn test_etcd_and_keypairs() {
    let (temp, plugins, cluster) = setup();
    let loader = AssetLoader::new(temp.path());
    let enablement = Enablement::cluster(&cluster.plugins);
    let ext = ClusterExtension::new(&plugins, &enablement, &loader);
    let ctx = RenderContext::from_value(cluster.render_context());

    let etcd = ext.etcd(&ctx).unwrap();
    assert_eq!(etcd.machine.files[0].content, "etcd-demo");

    let keypairs = ext.key_pair_specs(&ctx).unwrap();
    assert_eq!(keypairs.len(), 1);
    assert_eq!(keypairs[0].common_name, "bar");
}

#[test]
fn test_output_is_deterministic() {
    let (temp, plugins, cluster) = setup();
    let enablement = Enablement::cluster(&cluster.plugins);
    let ctx = RenderContext::from_value(cluster.render_context());

    let first = serde_json::to_string(&worker_for(&plugins, &enablement, temp.path(), &ctx)).unwrap();
    let second = serde_json::to_string(&worker_for(&plugins, &enablement, temp.path(), &ctx)).unwrap();
    assert_eq!(first, second);
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl CompositionObserver for RecordingObserver {
    fn plugin_skipped(&self, plugin: &str, artifact: &str) {
        self.events.lock().unwrap().push(format!("skip {plugin} {artifact}"));
    }

    fn plugin_contributed(&self, plugin: &str, artifact: &str, contributions: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {plugin} {artifact} {contributions}"));
    }

    fn resolved(&self, _plugin: &str, _what: &str) {}
}

#[test]
fn test_observer_records_plugin_order() {
    let (temp, plugins, cluster) = setup();
    let loader = AssetLoader::new(temp.path());
    let enablement = Enablement::cluster(&cluster.plugins);
    let observer = Arc::new(RecordingObserver::default());
    let ext = ClusterExtension::new(&plugins, &enablement, &loader)
        .with_observer(observer.clone());

    ext.root_stack(&RenderContext::new(), &RenderContext::new())
        .unwrap();

    let events = observer.events.lock().unwrap();
    assert_eq!(
        *events,
        vec!["done labels root stack 0".to_string(), "done queue root stack 1".to_string()]
    );
}
