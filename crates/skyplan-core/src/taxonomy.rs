//! Static catalog of resource types per provider.
//!
//! Each `(provider, resourceType)` pair maps to a category and a typed
//! default configuration. Templates are typed here and only degrade to a
//! string map once copied into a node's `properties`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{Error, Properties, Result};

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, schemars::JsonSchema,
)]
pub enum Provider {
    #[serde(rename = "AWS")]
    Aws,
    Azure,
    #[serde(rename = "GCP")]
    Gcp,
    Kubernetes,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Aws,
        Provider::Azure,
        Provider::Gcp,
        Provider::Kubernetes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Azure => "Azure",
            Provider::Gcp => "GCP",
            Provider::Kubernetes => "Kubernetes",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, schemars::JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Compute,
    Storage,
    Database,
    Network,
    Serverless,
    #[serde(rename = "loadbalancer")]
    LoadBalancer,
    OrchestrationPod,
    OrchestrationService,
    OrchestrationDeployment,
    OrchestrationConfigmap,
    OrchestrationSecret,
    OrchestrationIngress,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Compute => "compute",
            Category::Storage => "storage",
            Category::Database => "database",
            Category::Network => "network",
            Category::Serverless => "serverless",
            Category::LoadBalancer => "loadbalancer",
            Category::OrchestrationPod => "orchestration-pod",
            Category::OrchestrationService => "orchestration-service",
            Category::OrchestrationDeployment => "orchestration-deployment",
            Category::OrchestrationConfigmap => "orchestration-configmap",
            Category::OrchestrationSecret => "orchestration-secret",
            Category::OrchestrationIngress => "orchestration-ingress",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default configuration for one resource type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceTemplate {
    Ec2 {
        instance_type: &'static str,
        ami: &'static str,
        region: &'static str,
    },
    S3 {
        bucket_name: &'static str,
        region: &'static str,
        access: &'static str,
    },
    Rds {
        engine: &'static str,
        instance_class: &'static str,
        storage: &'static str,
    },
    AwsVpc {
        cidr_block: &'static str,
        region: &'static str,
    },
    Lambda {
        runtime: &'static str,
        memory: &'static str,
        timeout: &'static str,
    },
    Elb {
        scheme: &'static str,
        listener_port: &'static str,
    },
    AzureVm {
        size: &'static str,
        image: &'static str,
        region: &'static str,
    },
    AzureBlob {
        account_name: &'static str,
        tier: &'static str,
        region: &'static str,
    },
    AzureSql {
        edition: &'static str,
        region: &'static str,
    },
    AzureVnet {
        address_space: &'static str,
        region: &'static str,
    },
    AzureFunctions {
        runtime: &'static str,
        plan: &'static str,
    },
    AzureLb {
        sku: &'static str,
        region: &'static str,
    },
    GcpCompute {
        machine_type: &'static str,
        image: &'static str,
        zone: &'static str,
    },
    GcpStorage {
        bucket_name: &'static str,
        location: &'static str,
        storage_class: &'static str,
    },
    GcpSql {
        database_version: &'static str,
        tier: &'static str,
        region: &'static str,
    },
    GcpVpc { subnet_mode: &'static str },
    GcpFunctions {
        runtime: &'static str,
        memory: &'static str,
        region: &'static str,
    },
    GcpLb {
        scheme: &'static str,
        port: &'static str,
    },
    Pod {
        image: &'static str,
        replicas: &'static str,
    },
    Service {
        service_type: &'static str,
        port: &'static str,
    },
    Deployment {
        image: &'static str,
        replicas: &'static str,
    },
    ConfigMap { name: &'static str },
    Secret { secret_type: &'static str },
    Ingress {
        host: &'static str,
        path: &'static str,
    },
}

impl ResourceTemplate {
    fn fields(&self) -> Vec<(&'static str, &'static str)> {
        use ResourceTemplate::*;
        match *self {
            Ec2 {
                instance_type,
                ami,
                region,
            } => vec![
                ("instance_type", instance_type),
                ("ami", ami),
                ("region", region),
            ],
            S3 {
                bucket_name,
                region,
                access,
            } => vec![
                ("bucket_name", bucket_name),
                ("region", region),
                ("access", access),
            ],
            Rds {
                engine,
                instance_class,
                storage,
            } => vec![
                ("engine", engine),
                ("instance_class", instance_class),
                ("storage", storage),
            ],
            AwsVpc { cidr_block, region } => vec![("cidr_block", cidr_block), ("region", region)],
            Lambda {
                runtime,
                memory,
                timeout,
            } => vec![
                ("runtime", runtime),
                ("memory", memory),
                ("timeout", timeout),
            ],
            Elb {
                scheme,
                listener_port,
            } => vec![("scheme", scheme), ("listener_port", listener_port)],
            AzureVm {
                size,
                image,
                region,
            } => vec![("size", size), ("image", image), ("region", region)],
            AzureBlob {
                account_name,
                tier,
                region,
            } => vec![
                ("account_name", account_name),
                ("tier", tier),
                ("region", region),
            ],
            AzureSql { edition, region } => vec![("edition", edition), ("region", region)],
            AzureVnet {
                address_space,
                region,
            } => vec![("address_space", address_space), ("region", region)],
            AzureFunctions { runtime, plan } => vec![("runtime", runtime), ("plan", plan)],
            AzureLb { sku, region } => vec![("sku", sku), ("region", region)],
            GcpCompute {
                machine_type,
                image,
                zone,
            } => vec![
                ("machine_type", machine_type),
                ("image", image),
                ("zone", zone),
            ],
            GcpStorage {
                bucket_name,
                location,
                storage_class,
            } => vec![
                ("bucket_name", bucket_name),
                ("location", location),
                ("storage_class", storage_class),
            ],
            GcpSql {
                database_version,
                tier,
                region,
            } => vec![
                ("database_version", database_version),
                ("tier", tier),
                ("region", region),
            ],
            GcpVpc { subnet_mode } => vec![("subnet_mode", subnet_mode)],
            GcpFunctions {
                runtime,
                memory,
                region,
            } => vec![("runtime", runtime), ("memory", memory), ("region", region)],
            GcpLb { scheme, port } => vec![("scheme", scheme), ("port", port)],
            Pod { image, replicas } | Deployment { image, replicas } => {
                vec![("image", image), ("replicas", replicas)]
            }
            Service { service_type, port } => vec![("type", service_type), ("port", port)],
            ConfigMap { name } => vec![("name", name)],
            Secret { secret_type } => vec![("type", secret_type)],
            Ingress { host, path } => vec![("host", host), ("path", path)],
        }
    }

    /// Fresh, independently owned copy of the template as node properties.
    pub fn to_properties(&self) -> Properties {
        self.fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    pub provider: Provider,
    pub resource_type: &'static str,
    pub category: Category,
    pub template: ResourceTemplate,
}

const fn spec(
    provider: Provider,
    resource_type: &'static str,
    category: Category,
    template: ResourceTemplate,
) -> ResourceSpec {
    ResourceSpec {
        provider,
        resource_type,
        category,
        template,
    }
}

fn builtin_entries() -> Vec<ResourceSpec> {
    use Category::*;
    use Provider::*;
    use ResourceTemplate as T;
    vec![
        spec(Aws, "EC2", Compute, T::Ec2 {
            instance_type: "t2.micro",
            ami: "ami-0c55b159cbfafe1f0",
            region: "us-east-1",
        }),
        spec(Aws, "S3", Storage, T::S3 {
            bucket_name: "",
            region: "us-east-1",
            access: "private",
        }),
        spec(Aws, "RDS", Database, T::Rds {
            engine: "postgres",
            instance_class: "db.t3.micro",
            storage: "20",
        }),
        spec(Aws, "VPC", Network, T::AwsVpc {
            cidr_block: "10.0.0.0/16",
            region: "us-east-1",
        }),
        spec(Aws, "Lambda", Serverless, T::Lambda {
            runtime: "nodejs18.x",
            memory: "128",
            timeout: "3",
        }),
        spec(Aws, "ELB", LoadBalancer, T::Elb {
            scheme: "internet-facing",
            listener_port: "80",
        }),
        spec(Azure, "VM", Compute, T::AzureVm {
            size: "Standard_B1s",
            image: "UbuntuLTS",
            region: "eastus",
        }),
        spec(Azure, "Blob", Storage, T::AzureBlob {
            account_name: "",
            tier: "Hot",
            region: "eastus",
        }),
        spec(Azure, "SQL", Database, T::AzureSql {
            edition: "Basic",
            region: "eastus",
        }),
        spec(Azure, "VNet", Network, T::AzureVnet {
            address_space: "10.0.0.0/16",
            region: "eastus",
        }),
        spec(Azure, "Functions", Serverless, T::AzureFunctions {
            runtime: "node",
            plan: "Consumption",
        }),
        spec(Azure, "LB", LoadBalancer, T::AzureLb {
            sku: "Basic",
            region: "eastus",
        }),
        spec(Gcp, "Compute", Compute, T::GcpCompute {
            machine_type: "e2-micro",
            image: "debian-cloud/debian-10",
            zone: "us-central1-a",
        }),
        spec(Gcp, "Storage", Storage, T::GcpStorage {
            bucket_name: "",
            location: "US",
            storage_class: "STANDARD",
        }),
        spec(Gcp, "SQL", Database, T::GcpSql {
            database_version: "POSTGRES_14",
            tier: "db-f1-micro",
            region: "us-central1",
        }),
        spec(Gcp, "VPC", Network, T::GcpVpc {
            subnet_mode: "auto",
        }),
        spec(Gcp, "Functions", Serverless, T::GcpFunctions {
            runtime: "nodejs18",
            memory: "256MB",
            region: "us-central1",
        }),
        spec(Gcp, "LB", LoadBalancer, T::GcpLb {
            scheme: "EXTERNAL",
            port: "80",
        }),
        spec(Kubernetes, "Pod", OrchestrationPod, T::Pod {
            image: "nginx:latest",
            replicas: "1",
        }),
        spec(Kubernetes, "Service", OrchestrationService, T::Service {
            service_type: "ClusterIP",
            port: "80",
        }),
        spec(Kubernetes, "Deployment", OrchestrationDeployment, T::Deployment {
            image: "nginx:latest",
            replicas: "3",
        }),
        spec(Kubernetes, "ConfigMap", OrchestrationConfigmap, T::ConfigMap {
            name: "",
        }),
        spec(Kubernetes, "Secret", OrchestrationSecret, T::Secret {
            secret_type: "Opaque",
        }),
        spec(Kubernetes, "Ingress", OrchestrationIngress, T::Ingress {
            host: "",
            path: "/",
        }),
    ]
}

static BUILTIN: Lazy<Arc<Taxonomy>> =
    Lazy::new(|| Arc::new(Taxonomy::from_entries(builtin_entries())));

/// Read-only lookup table keyed by `(provider, resourceType)`.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    entries: Vec<ResourceSpec>,
    index: HashMap<Provider, HashMap<&'static str, usize>>,
}

impl Taxonomy {
    /// The process-wide catalog, built once on first use.
    pub fn builtin() -> Arc<Taxonomy> {
        Arc::clone(&BUILTIN)
    }

    /// Later entries for the same pair replace earlier ones.
    pub fn from_entries(entries: Vec<ResourceSpec>) -> Self {
        let mut deduped: Vec<ResourceSpec> = Vec::with_capacity(entries.len());
        let mut index: HashMap<Provider, HashMap<&'static str, usize>> = HashMap::new();
        for entry in entries {
            let slots = index.entry(entry.provider).or_default();
            match slots.get(entry.resource_type) {
                Some(&i) => deduped[i] = entry,
                None => {
                    slots.insert(entry.resource_type, deduped.len());
                    deduped.push(entry);
                }
            }
        }
        Self {
            entries: deduped,
            index,
        }
    }

    pub fn entries(&self) -> &[ResourceSpec] {
        &self.entries
    }

    pub fn entries_for(&self, provider: Provider) -> impl Iterator<Item = &ResourceSpec> {
        self.entries.iter().filter(move |e| e.provider == provider)
    }

    pub fn lookup(&self, provider: &str, resource_type: &str) -> Result<&ResourceSpec> {
        provider
            .parse::<Provider>()
            .ok()
            .and_then(|p| self.get(p, resource_type))
            .ok_or_else(|| Error::UnknownResourceType {
                provider: provider.to_string(),
                resource_type: resource_type.to_string(),
            })
    }

    pub fn get(&self, provider: Provider, resource_type: &str) -> Option<&ResourceSpec> {
        self.index
            .get(&provider)
            .and_then(|slots| slots.get(resource_type))
            .map(|&i| &self.entries[i])
    }

    /// Always a fresh copy; callers may mutate it freely.
    pub fn defaults_for(&self, provider: &str, resource_type: &str) -> Result<Properties> {
        self.lookup(provider, resource_type)
            .map(|s| s.template.to_properties())
    }

    /// Category a catalog pair is tagged with. Once a node has been created
    /// or validated its stored `category` is authoritative, and the
    /// controller reads it from the node rather than asking again.
    pub fn category_of(&self, provider: &str, resource_type: &str) -> Result<Category> {
        self.lookup(provider, resource_type).map(|s| s.category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_pair() {
        let tax = Taxonomy::builtin();
        let ec2 = tax.lookup("AWS", "EC2").unwrap();
        assert_eq!(ec2.category, Category::Compute);
        let service = tax.category_of("Kubernetes", "Service").unwrap();
        assert_eq!(service, Category::OrchestrationService);
    }

    #[test]
    fn lookup_unknown_pair_fails() {
        let tax = Taxonomy::builtin();
        let err = tax.lookup("AWS", "VM").unwrap_err();
        let expected = Error::UnknownResourceType {
            provider: "AWS".into(),
            resource_type: "VM".into(),
        };
        assert_eq!(err, expected);
        assert!(tax.lookup("Oracle", "EC2").is_err());
    }

    #[test]
    fn defaults_are_independent_copies() {
        let tax = Taxonomy::builtin();
        let mut first = tax.defaults_for("AWS", "EC2").unwrap();
        first.insert("instance_type".into(), "m5.large".into());
        let second = tax.defaults_for("AWS", "EC2").unwrap();
        let instance_type = second.get("instance_type").map(String::as_str);
        assert_eq!(instance_type, Some("t2.micro"));
        let keys: Vec<&str> = second.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["instance_type", "ami", "region"]);
    }

    #[test]
    fn every_provider_has_entries() {
        let tax = Taxonomy::builtin();
        for provider in Provider::ALL {
            assert_eq!(tax.entries_for(provider).count(), 6, "{provider}");
        }
    }

    #[test]
    fn later_entries_replace_earlier() {
        use Category::{Compute, Serverless};
        use Provider::Aws;
        use ResourceTemplate::ConfigMap;
        let tax = Taxonomy::from_entries(vec![
            spec(Aws, "EC2", Compute, ConfigMap { name: "a" }),
            spec(Aws, "EC2", Serverless, ConfigMap { name: "b" }),
        ]);
        assert_eq!(tax.len(), 1);
        assert_eq!(tax.category_of("AWS", "EC2").unwrap(), Category::Serverless);
    }
}
