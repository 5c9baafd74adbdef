use crate::{PanelOptions, Result};
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::future::Future;
use svgflow_core::{
    Change, DataFrame, DataMap, ElementUniverse, EvalContext, GroupedRules, ResolverCache,
    TooltipContent, assemble_directives, extract_series, load_rules_lenient,
    parse_yaml_to_grouped_rules, resolve_rules,
};
use svgflow_render::{ApplyStats, SvgCanvas};

/// Rendered when the panel has no usable SVG.
pub const FALLBACK_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub svg: String,
    pub tooltips: Vec<TooltipContent>,
    pub stats: ApplyStats,
}

impl RenderOutput {
    fn fallback() -> Self {
        Self {
            svg: FALLBACK_SVG.to_string(),
            tooltips: Vec::new(),
            stats: ApplyStats::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered(RenderOutput),
    /// A newer pass started while this one was waiting for data; nothing was written.
    Superseded,
}

impl RenderOutcome {
    pub fn into_output(self) -> Option<RenderOutput> {
        match self {
            Self::Rendered(out) => Some(out),
            Self::Superseded => None,
        }
    }
}

#[derive(Debug, Default)]
struct PanelState {
    canvas: Option<SvgCanvas>,
    cache: ResolverCache,
    rules: GroupedRules,
    flat_rules: Vec<Change>,
    last: Option<RenderOutput>,
}

/// One panel instance: an SVG, a rule set and the state carried between refreshes.
///
/// A panel is driven from a single task. Every render pass takes a generation token; a pass that
/// finds a newer token after awaiting its data returns [`RenderOutcome::Superseded`].
#[derive(Debug, Default)]
pub struct Panel {
    options: PanelOptions,
    fixed_now: Option<DateTime<Utc>>,
    generation: Cell<u64>,
    state: RefCell<PanelState>,
}

impl Panel {
    pub fn new(options: PanelOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Pins the clock used by threshold conditions and `$dateN` filters.
    pub fn with_fixed_now(mut self, now: Option<DateTime<Utc>>) -> Self {
        self.fixed_now = now;
        self
    }

    pub fn options(&self) -> &PanelOptions {
        &self.options
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Replaces the SVG. On a parse error the panel renders [`FALLBACK_SVG`] until a valid SVG
    /// is set.
    pub fn set_svg(&self, svg: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.cache.clear();
        state.last = None;
        match SvgCanvas::parse(svg) {
            Ok(canvas) => {
                state.canvas = Some(canvas);
                Ok(())
            }
            Err(err) => {
                state.canvas = None;
                tracing::warn!(error = %err, "SVG could not be parsed");
                Err(err.into())
            }
        }
    }

    pub fn set_rules(&self, rules: GroupedRules) {
        let mut state = self.state.borrow_mut();
        state.flat_rules = rules.flatten();
        state.rules = rules;
        state.cache.clear();
    }

    /// Parses and installs a rule document; a malformed document installs no rules.
    pub fn set_rules_yaml(&self, yaml: &str) -> usize {
        let rules = load_rules_lenient(yaml);
        let count = rules.rule_count();
        self.set_rules(rules);
        count
    }

    /// Like [`Panel::set_rules_yaml`], but keeps the current rules on a parse error.
    pub fn try_set_rules_yaml(&self, yaml: &str) -> Result<usize> {
        let rules = parse_yaml_to_grouped_rules(yaml)?;
        let count = rules.rule_count();
        self.set_rules(rules);
        Ok(count)
    }

    pub fn rules(&self) -> GroupedRules {
        self.state.borrow().rules.clone()
    }

    pub fn last_output(&self) -> Option<RenderOutput> {
        self.state.borrow().last.clone()
    }

    /// Drops the rendered output, the SVG and every cache.
    pub fn teardown(&self) {
        let mut state = self.state.borrow_mut();
        state.canvas = None;
        state.last = None;
        state.cache.clear();
    }

    fn next_generation(&self) -> u64 {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        generation
    }

    /// One refresh: awaits the frames, then recolors the SVG unless a newer pass has started.
    pub async fn render<F>(&self, frames: F) -> RenderOutcome
    where
        F: Future<Output = Vec<DataFrame>>,
    {
        let generation = self.next_generation();
        let frames = frames.await;
        if self.generation.get() != generation {
            tracing::debug!(generation, "render pass superseded");
            return RenderOutcome::Superseded;
        }
        RenderOutcome::Rendered(self.render_frames(&frames))
    }

    pub fn render_sync(&self, frames: &[DataFrame]) -> RenderOutput {
        self.next_generation();
        self.render_frames(frames)
    }

    fn render_frames(&self, frames: &[DataFrame]) -> RenderOutput {
        let now = self.fixed_now.unwrap_or_else(Utc::now);
        let values = extract_series(frames);

        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let Some(canvas) = state.canvas.as_mut() else {
            return RenderOutput::fallback();
        };

        let universe = ElementUniverse::new(canvas.element_ids());
        let resolved = resolve_rules(&state.flat_rules, &universe, &mut state.cache);
        let ctx = EvalContext::new(&values, now);
        let directives = assemble_directives(&DataMap::build(&resolved, &ctx));

        canvas.set_viewport(&self.options.preserve_aspect_ratio);
        let stats = canvas.apply(&directives);
        tracing::debug!(
            rules = resolved.len(),
            elements = directives.len(),
            painted = stats.painted,
            labeled = stats.labeled,
            "render pass applied"
        );

        let mut tooltips: Vec<TooltipContent> = if self.options.tooltip.enabled {
            directives.into_iter().flat_map(|d| d.tooltips).collect()
        } else {
            Vec::new()
        };
        if self.options.tooltip.sort_by_level {
            tooltips.sort_by(|a, b| b.lvl.cmp(&a.lvl));
        }

        let out = RenderOutput {
            svg: canvas.to_svg_string(),
            tooltips,
            stats,
        };
        state.last = Some(out.clone());
        out
    }
}
