//! Temporary resource bundle mirroring the assets shipped with the server.

use std::fs;
use tempfile::TempDir;

use crate::resources::{DirectorySource, ResourceResolver};

/// Main configuration template with every connector and keystore token.
const CONFIG_TEMPLATE: &str = "
dn: cn=LDAP Connection Handler,cn=Connection Handlers,cn=config
ds-cfg-enabled: ldap.enable
ds-cfg-listen-port: ldap.port

dn: cn=LDAPS Connection Handler,cn=Connection Handlers,cn=config
ds-cfg-enabled: ldaps.enable
ds-cfg-listen-port: ldaps.port
ds-cfg-key-manager-provider: key.store.loc

dn: cn=Administration Connector,cn=config
ds-cfg-enabled: admin.enable
ds-cfg-listen-port: admin.port

dn: cn=JKS,cn=Key Manager Providers,cn=config
ds-cfg-key-store-file: key.store.loc
ds-cfg-key-store-type: key.store.type
ds-cfg-key-store-pin-file: key.store.pin.loc

dn: cn=JKS,cn=Trust Manager Providers,cn=config
ds-cfg-trust-store-file: trust.store.loc
ds-cfg-trust-store-type: trust.store.type
ds-cfg-trust-store-pin-file: trust.store.pin.loc
";

/// Seed entries loaded on first start, in discovery order.
pub const SEED_FILES: [(&str, &str); 2] = [
    (
        "default-base.ldif",
        "dn: dc=example,dc=com\nobjectClass: domain\ndc: example\n",
    ),
    (
        "default-users.ldif",
        "dn: ou=users,dc=example,dc=com\nobjectClass: organizationalUnit\nou: users\n\n\
         dn: uid=alice,ou=users,dc=example,dc=com\nobjectClass: person\nuid: alice\n",
    ),
];

/// Resource bundle laid out in a temporary directory.
pub struct ResourceBundle {
    root: TempDir,
}

impl ResourceBundle {
    /// Writes the complete default asset set.
    pub fn complete() -> Self {
        let bundle = Self::empty();
        bundle.write("config/config.ldif", CONFIG_TEMPLATE);
        bundle.write("config/admin-backend.ldif", "dn: ds-cfg-backend-id=adminRoot\n");
        bundle.write("config/buildinfo", "4.0.0.9086\n");
        bundle.write("config/schema/00-core.ldif", "dn: cn=schema\n");
        bundle.write("config/schema/99-user.ldif", "dn: cn=schema\n");
        bundle.write("config/schema/README", "not a schema file\n");
        bundle.write("config/upgrade/schema.ldif.9086", "dn: cn=schema\n");
        for (name, contents) in SEED_FILES {
            bundle.write(name, contents);
        }
        bundle
    }

    /// Creates a bundle without any resources.
    pub fn empty() -> Self {
        Self {
            root: TempDir::new().expect("create resource bundle"),
        }
    }

    /// Adds or replaces a resource.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create bundle directory");
        }
        fs::write(path, contents).expect("write bundle resource");
    }

    /// Removes a resource.
    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.root.path().join(relative)).expect("remove bundle resource");
    }

    /// Resolver serving this bundle.
    pub fn resolver(&self) -> ResourceResolver {
        ResourceResolver::new().with_source(DirectorySource::new("bundle", self.root.path()))
    }
}
