//! PKI keypair requests contributed by plugins.

use forge_api::KeyPairSpec;
use forge_templates::RenderContext;

use crate::error::ExtensionResult;
use crate::extension::ClusterExtension;

impl ClusterExtension<'_> {
    /// Keypair specs of all enabled plugins with templated names rendered.
    pub fn key_pair_specs(&self, ctx: &RenderContext) -> ExtensionResult<Vec<KeyPairSpec>> {
        let mut specs = Vec::new();

        self.for_each_enabled("keypairs", |plugin, config| {
            let values = self.plugin_values(plugin, config, ctx)?;
            let resolver = self.resolver(plugin, ctx, &values);
            let keypairs = &plugin.spec.cluster.pki.keypairs;

            for keypair in keypairs {
                let what = format!("pki.keypairs[{}]", keypair.name);
                let mut spec = keypair.clone();
                spec.common_name = resolver.string(&keypair.common_name, &format!("{what}.commonName"))?;
                spec.organization =
                    resolver.string(&keypair.organization, &format!("{what}.organization"))?;
                spec.dns_names = keypair
                    .dns_names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| resolver.string(name, &format!("{what}.dnsNames[{i}]")))
                    .collect::<Result<_, _>>()?;

                self.observer().resolved(plugin.name(), &what);
                specs.push(spec);
            }
            Ok(keypairs.len())
        })?;

        Ok(specs)
    }
}
