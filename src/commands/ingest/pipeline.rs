use super::*;

/// A parsed unit together with the source document it came from.
#[derive(Debug, Clone)]
pub(super) struct SourcedUnit {
    pub(super) unit: ParsedUnit,
    pub(super) source: SourceEntry,
}

impl NaturalKey for SourcedUnit {
    fn natural_key(&self) -> Option<&str> {
        self.unit.natural_key()
    }
}

#[derive(Debug)]
pub(super) struct SourceOutcome {
    pub(super) extracted: bool,
    pub(super) page_count: usize,
    pub(super) units: Vec<SourcedUnit>,
    pub(super) not_applicable: usize,
    pub(super) failures: Vec<UnitFailureRecord>,
}

#[derive(Debug, Default)]
pub(super) struct CollectedUnits {
    pub(super) by_family: BTreeMap<DocumentFamily, Vec<SourcedUnit>>,
    pub(super) failures: Vec<UnitFailureRecord>,
    pub(super) processed_source_count: usize,
    pub(super) page_count: usize,
    pub(super) units_parsed: usize,
    pub(super) units_not_applicable: usize,
    pub(super) duplicate_units_dropped: usize,
}

/// Parses every source on a dedicated pool. Outcomes come back in source
/// order regardless of which worker finished first.
pub(super) fn parse_sources(
    grammar: &OutlineGrammar,
    source_dir: &Path,
    sources: &[SourceEntry],
    families: &[DocumentFamily],
    max_pages_per_doc: Option<usize>,
    threads: Option<usize>,
) -> Result<Vec<SourceOutcome>> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder
        .build()
        .context("failed to build parser thread pool")?;

    let outcomes = pool.install(|| {
        sources
            .par_iter()
            .map(|source| parse_source(grammar, source_dir, source, families, max_pages_per_doc))
            .collect::<Vec<SourceOutcome>>()
    });

    Ok(outcomes)
}

pub(super) fn parse_source(
    grammar: &OutlineGrammar,
    source_dir: &Path,
    source: &SourceEntry,
    families: &[DocumentFamily],
    max_pages_per_doc: Option<usize>,
) -> SourceOutcome {
    let mut outcome = SourceOutcome {
        extracted: false,
        page_count: 0,
        units: Vec::new(),
        not_applicable: 0,
        failures: Vec::new(),
    };

    let wanted = source
        .kind
        .families()
        .iter()
        .copied()
        .filter(|family| families.contains(family))
        .collect::<Vec<DocumentFamily>>();
    if wanted.is_empty() {
        return outcome;
    }

    let path = source_dir.join(&source.filename);
    let pages = match load_source_pages(&path, max_pages_per_doc) {
        Ok(pages) => pages,
        Err(err) => {
            let reason = format!("extraction failed: {err:#}");
            warn!(source = %source.filename, reason = %reason, "skipping source");
            for family in wanted {
                outcome.failures.push(UnitFailureRecord {
                    family,
                    key: source.key.clone().unwrap_or_else(|| "*".to_string()),
                    source: source.filename.clone(),
                    reason: reason.clone(),
                });
            }
            return outcome;
        }
    };

    outcome.extracted = true;
    outcome.page_count = pages.len();
    let units = parse_pages(grammar, source, &pages, &wanted);
    outcome.units = units.units;
    outcome.not_applicable = units.not_applicable;
    outcome.failures = units.failures;

    debug!(
        source = %source.filename,
        pages = outcome.page_count,
        units = outcome.units.len(),
        not_applicable = outcome.not_applicable,
        failures = outcome.failures.len(),
        "parsed source"
    );

    outcome
}

pub(super) struct PageUnits {
    pub(super) units: Vec<SourcedUnit>,
    pub(super) not_applicable: usize,
    pub(super) failures: Vec<UnitFailureRecord>,
}

/// Runs each wanted family's assembler over one document's pages.
pub(super) fn parse_pages<S: AsRef<str>>(
    grammar: &OutlineGrammar,
    source: &SourceEntry,
    pages: &[Vec<S>],
    families: &[DocumentFamily],
) -> PageUnits {
    let mut parsed = PageUnits {
        units: Vec::new(),
        not_applicable: 0,
        failures: Vec::new(),
    };

    for &family in families {
        match assemble(grammar, pages, family, unit_key_for(family, source)) {
            Ok(Some(unit)) => parsed.units.push(SourcedUnit {
                unit,
                source: source.clone(),
            }),
            Ok(None) => {
                debug!(source = %source.filename, family = %family, "unit not applicable");
                parsed.not_applicable += 1;
            }
            Err(err) => {
                warn!(
                    source = %source.filename,
                    family = %err.family(),
                    key = %err.key(),
                    error = %err,
                    "unit failed"
                );
                parsed.failures.push(UnitFailureRecord {
                    family: err.family(),
                    key: err.key().to_string(),
                    source: source.filename.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    parsed
}

/// Section notes are found by position rather than by number, since a
/// chapter document carries at most the section it opens.
fn unit_key_for(family: DocumentFamily, source: &SourceEntry) -> Option<&str> {
    match family {
        DocumentFamily::SectionNotes | DocumentFamily::GeneralRules => None,
        _ => source.key.as_deref(),
    }
}

/// Joins all outcomes, then keeps the first unit seen per family and key.
pub(super) fn collect_outcomes(
    outcomes: Vec<SourceOutcome>,
    families: &[DocumentFamily],
) -> CollectedUnits {
    let mut collected = CollectedUnits::default();
    for &family in families {
        collected.by_family.entry(family).or_default();
    }

    for outcome in outcomes {
        if outcome.extracted {
            collected.processed_source_count += 1;
        }
        collected.page_count += outcome.page_count;
        collected.units_not_applicable += outcome.not_applicable;
        collected.units_parsed += outcome.units.len();
        collected.failures.extend(outcome.failures);

        for sourced in outcome.units {
            collected
                .by_family
                .entry(sourced.unit.family())
                .or_default()
                .push(sourced);
        }
    }

    for units in collected.by_family.values_mut() {
        let before = units.len();
        *units = deduplicate(std::mem::take(units));
        collected.duplicate_units_dropped += before - units.len();
    }

    collected
}
