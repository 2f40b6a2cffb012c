//! Narrator boundary — turns computed scalars into natural-language text
//!
//! The language-model service is external. The engine only builds the
//! request from a snapshot taken under the lock; the call itself happens
//! outside it.

use async_trait::async_trait;
use cognis_core::{Result, Snapshot};

/// What a narrator receives.
#[derive(Debug, Clone)]
pub struct NarrationRequest {
    pub system: String,
    pub prompt: String,
    pub snapshot: Snapshot,
}

/// External text generator.
#[async_trait]
pub trait Narrator: Send + Sync {
    fn name(&self) -> &str;

    async fn narrate(&self, request: NarrationRequest) -> Result<String>;
}

const SYSTEM_PROMPT: &str = "You describe the current cognitive state of a simulated mind \
in two or three plain sentences. Refer only to the figures given.";

pub fn build_request(snapshot: &Snapshot) -> NarrationRequest {
    let q = &snapshot.quantum;
    let m = &snapshot.meta;
    let mut prompt = format!(
        "iteration {}\n|Ψ| {:.4}, phase {:.3} rad, ω {:.3}\n\
         awareness {:.1}%, self-model accuracy {:.1}%, recursion depth {} ({:?})\n\
         mood {:.3}, volatility {:.3}\n\
         dominant mode {}, entropy {:.3} bits, coherence {:.3}, superposition {}\n",
        snapshot.iteration,
        snapshot.psi.magnitude,
        snapshot.psi.phase,
        snapshot.omega,
        m.awareness_pct,
        m.self_model_accuracy_pct,
        m.recursion_depth,
        m.loop_phase,
        snapshot.emotion.mood,
        snapshot.emotion.volatility,
        q.dominant_basis,
        q.entropy,
        q.total_coherence,
        q.in_superposition,
    );
    for a in &q.attractors {
        prompt.push_str(&format!("goal toward {} (weight {:.3}, {:?})\n", a.aligned_basis, a.weight, a.source));
    }
    NarrationRequest { system: SYSTEM_PROMPT.to_string(), prompt, snapshot: snapshot.clone() }
}

/// Offline narrator that renders a fixed template from the snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateNarrator;

#[async_trait]
impl Narrator for TemplateNarrator {
    fn name(&self) -> &str {
        "template"
    }

    async fn narrate(&self, request: NarrationRequest) -> Result<String> {
        let s = &request.snapshot;
        let state = if s.quantum.in_superposition { "undecided between modes" } else { "settled" };
        let lean = if s.emotion.mood > 0.1 {
            "leaning positive"
        } else if s.emotion.mood < -0.1 {
            "leaning negative"
        } else {
            "emotionally even"
        };
        let mut text = format!(
            "After {} steps the mind is {}, mostly {}, and {}.",
            s.iteration, state, s.quantum.dominant_basis, lean
        );
        if s.meta.loop_detected {
            text.push_str(&format!(" It has caught itself in a loop {} levels deep.", s.meta.recursion_depth));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::export_snapshot;
    use crate::state::CoreState;

    #[test]
    fn prompt_carries_the_figures() {
        let req = build_request(&export_snapshot(&CoreState::default()));
        assert!(req.prompt.starts_with("iteration 0\n"));
        assert!(req.prompt.contains("dominant mode focused"));
        assert!(!req.system.is_empty());
    }

    #[tokio::test]
    async fn template_narrator_is_deterministic() {
        let req = build_request(&export_snapshot(&CoreState::default()));
        let a = TemplateNarrator.narrate(req.clone()).await.unwrap();
        let b = TemplateNarrator.narrate(req).await.unwrap();
        assert_eq!(a, b);
        assert!(a.contains("undecided"));
    }
}
