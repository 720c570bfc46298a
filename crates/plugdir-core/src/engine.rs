//! The resolution pipeline.
//!
//! Name resolution and multi-module expansion feed reconciliation, fetch
//! plans are executed, and the resulting link entries are assembled into a
//! layout. Every problem is recorded as a [`Diagnostic`]; nothing aborts a
//! run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::artifact::{ArtifactArena, ArtifactId, ResolvedArtifact};
use crate::fetch::SourceFetcher;
use crate::layout::{DevPathLayout, LinkEntry, assemble};
use crate::naming::{MappingTable, SpecTarget, expand, parse_identifier};
use crate::reconcile::{Decision, Strategy, forces_fetch, reconcile, target_version};
use crate::registry::Registry;
use crate::report::{Diagnostic, DiagnosticKind, ResolutionReport, SpecReport, warning_for};
use crate::types::PluginSpec;

/// Everything one run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub artifacts: ArtifactArena,
    pub entries: Vec<LinkEntry>,
    pub layout: DevPathLayout,
    pub report: ResolutionReport,
}

impl Resolution {
    pub fn link_names(&self) -> Vec<&str> {
        self.layout.link_names()
    }
}

/// Resolves catalogs against a registry, fetching from source as needed.
pub struct Resolver<R, F> {
    mappings: MappingTable,
    registry: R,
    fetcher: F,
    strategy: Strategy,
}

/// An artifact decision together with the diagnostics it raised.
struct Settled {
    artifact: ResolvedArtifact,
    diagnostics: Vec<Diagnostic>,
}

impl<R: Registry, F: SourceFetcher> Resolver<R, F> {
    pub fn new(mappings: MappingTable, registry: R, fetcher: F) -> Self {
        Self {
            mappings,
            registry,
            fetcher,
            strategy: Strategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn resolve(&self, specs: &[PluginSpec]) -> Resolution {
        let mut artifacts = ArtifactArena::new();
        let mut entries = Vec::with_capacity(specs.len());
        let mut diagnostics = Vec::new();

        let expanded: Vec<_> = specs.iter().map(|spec| expand(spec, &self.mappings)).collect();

        // Catalog positions of every module, per multi-module package
        let mut members: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (position, expansion) in expanded.iter().enumerate() {
            if let SpecTarget::MultiModule { package, .. } = &expansion.target {
                members.entry(package.as_str()).or_default().push(position);
            }
        }
        let mut packages: BTreeMap<&str, ArtifactId> = BTreeMap::new();

        for (position, (spec, expansion)) in specs.iter().zip(&expanded).enumerate() {
            if !spec.id.is_empty() && parse_identifier(&spec.id).is_none() {
                record(
                    &mut diagnostics,
                    Diagnostic::new(
                        DiagnosticKind::MalformedIdentifier,
                        position,
                        &spec.id,
                        "identifier is not in owner/repo form; using it as a single segment",
                    ),
                );
            }

            let artifact = match &expansion.target {
                SpecTarget::MultiModule { package, .. } => match packages.get(package.as_str()) {
                    Some(&artifact) => artifact,
                    None => {
                        let group = members
                            .remove(package.as_str())
                            .unwrap_or_else(|| vec![position]);
                        let artifact = self.resolve_package(
                            package,
                            &group,
                            specs,
                            &mut artifacts,
                            &mut diagnostics,
                        );
                        packages.insert(package.as_str(), artifact);
                        artifact
                    }
                },
                SpecTarget::Regular { lookup_key } => {
                    let settled = self.settle(position, spec, lookup_key);
                    for diagnostic in settled.diagnostics {
                        record(&mut diagnostics, diagnostic);
                    }
                    artifacts.push(settled.artifact)
                }
            };

            entries.push(LinkEntry {
                link_name: expansion.link_name.clone(),
                artifact,
                position,
                spec_id: spec.id.clone(),
            });
        }

        let assembly = assemble(&entries, &artifacts);
        for diagnostic in assembly.diagnostics {
            record(&mut diagnostics, diagnostic);
        }
        diagnostics.sort_by_key(|d| d.position);

        let specs_report = entries
            .iter()
            .map(|entry| {
                let artifact = &artifacts[entry.artifact];
                SpecReport {
                    id: entry.spec_id.clone(),
                    link_name: entry.link_name.clone(),
                    provenance: artifact.provenance,
                    concrete_version: artifact.concrete_version.clone(),
                    warning: warning_for(&diagnostics, entry.position),
                }
            })
            .collect();

        let report = ResolutionReport {
            specs: specs_report,
            diagnostics,
        };
        let summary = report.summary();
        tracing::info!(
            total = summary.total,
            registry = summary.registry,
            fetched = summary.fetched,
            unresolved = summary.unresolved,
            links = assembly.layout.len(),
            strategy = %self.strategy,
            "resolution complete"
        );

        Resolution {
            artifacts,
            entries,
            layout: assembly.layout,
            report,
        }
    }

    /// Decide a multi-module package once for all of its modules.
    ///
    /// A module that forces a fetch leads the group, so the package never
    /// comes from the registry while one of its modules tracks a branch.
    /// Otherwise the first module leads, and when it stays unresolved the
    /// later modules' content hashes are tried in catalog order.
    fn resolve_package(
        &self,
        package: &str,
        group: &[usize],
        specs: &[PluginSpec],
        artifacts: &mut ArtifactArena,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ArtifactId {
        let forcing = group
            .iter()
            .copied()
            .find(|&position| forces_fetch(&specs[position].version));
        let Some(mut lead) = forcing.or_else(|| group.first().copied()) else {
            return artifacts.push(ResolvedArtifact::unresolved(package));
        };

        let mut settled = self.settle(lead, &specs[lead], package);
        let mut failed = Vec::new();
        if forcing.is_none() && !settled.artifact.is_resolved() {
            let candidates = group
                .iter()
                .copied()
                .filter(|&position| position != lead)
                .filter(|&position| specs[position].version.content_hash().is_some());
            for candidate in candidates {
                let attempt = self.settle(candidate, &specs[candidate], package);
                if attempt.artifact.is_resolved() {
                    tracing::debug!(
                        package,
                        id = %specs[candidate].id,
                        "package resolved through a sibling module"
                    );
                    lead = candidate;
                    settled = attempt;
                    failed.clear();
                    break;
                }
                failed.extend(attempt.diagnostics);
            }
        }

        let resolved = settled.artifact.is_resolved();
        for diagnostic in settled.diagnostics.into_iter().chain(failed) {
            record(diagnostics, diagnostic);
        }
        let lead_spec = &specs[lead];
        for &position in group.iter().filter(|&&position| position != lead) {
            let spec = &specs[position];
            if resolved {
                check_sibling(position, spec, lead_spec, diagnostics);
            } else {
                record(
                    diagnostics,
                    Diagnostic::new(
                        DiagnosticKind::UnresolvedSpec,
                        position,
                        &spec.id,
                        format!("package {} could not be resolved (led by {})", package, lead_spec.id),
                    ),
                );
            }
        }

        artifacts.push(settled.artifact)
    }

    fn settle(&self, position: usize, spec: &PluginSpec, lookup_key: &str) -> Settled {
        let decision = reconcile(spec, lookup_key, &self.registry, self.strategy);
        tracing::debug!(id = %spec.id, key = lookup_key, ?decision, "reconciled");

        let diagnostic = |kind, message: String| Diagnostic::new(kind, position, &spec.id, message);
        let mut diagnostics = Vec::new();

        let artifact = match decision {
            Decision::Registry { entry, fallback } => {
                if let Some(fallback) = fallback {
                    diagnostics.push(diagnostic(
                        DiagnosticKind::VersionMismatchFallback,
                        fallback.message(),
                    ));
                }
                ResolvedArtifact::from_registry(lookup_key, &entry)
            }
            Decision::Fetch(plan) => match self.fetcher.fetch(&plan.request) {
                Ok(source) => {
                    if !plan.is_verified() {
                        diagnostics.push(diagnostic(
                            DiagnosticKind::UnverifiedFetch,
                            format!(
                                "fetched {} without a content hash; result is not reproducible",
                                plan.request.display_name()
                            ),
                        ));
                    }
                    ResolvedArtifact::fetched(lookup_key, &plan.request, source)
                }
                Err(err) => {
                    diagnostics.push(diagnostic(DiagnosticKind::FetchError, err.to_string()));
                    ResolvedArtifact::unresolved(lookup_key)
                }
            },
            Decision::Unresolved { reason } => {
                diagnostics.push(diagnostic(
                    DiagnosticKind::UnresolvedSpec,
                    reason.message().to_string(),
                ));
                ResolvedArtifact::unresolved(lookup_key)
            }
        };

        Settled {
            artifact,
            diagnostics,
        }
    }
}

/// Modules share the lead module's artifact; flag version metadata that
/// asks for something else.
fn check_sibling(
    position: usize,
    spec: &PluginSpec,
    lead: &PluginSpec,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(wanted) = target_version(&spec.version) else {
        return;
    };
    let shared = target_version(&lead.version);
    if shared.as_ref().map(|t| t.value.as_str()) == Some(wanted.value.as_str()) {
        return;
    }
    record(
        diagnostics,
        Diagnostic::new(
            DiagnosticKind::VersionMismatchFallback,
            position,
            &spec.id,
            format!(
                "wanted {}, sharing the package resolved for {}",
                wanted.value, lead.id
            ),
        ),
    );
}

fn record(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    tracing::warn!(
        kind = %diagnostic.kind,
        id = %diagnostic.spec_id,
        "{}",
        diagnostic.message
    );
    diagnostics.push(diagnostic);
}
