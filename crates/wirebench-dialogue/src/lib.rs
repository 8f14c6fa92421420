//! Scored branching dialogue for training scenarios.
//!
//! Instructors author a [`DialogueTree`] -- customer interviews, supervisor
//! briefings, safety quizzes -- and each trainee session walks it with a
//! [`DialogueRunner`]. Choices carry points (a probing question about the
//! breaker panel scores higher than small talk), and the runner's
//! [`diagnostic_ratio`](DialogueRunner::diagnostic_ratio) compares points
//! earned against the best single path's worth of each visited branch.
//!
//! # Overview
//!
//! Trees are built once via [`DialogueTree::build`] and never mutated; any
//! number of runners can replay the same tree. A runner is driven by two
//! calls: [`DialogueRunner::select_choice`] for nodes presenting options and
//! [`DialogueRunner::advance`] for plain narration nodes. The dialogue
//! completes when the next node reference is absent -- either authored as
//! `None` or pointing at an id the tree does not contain (legal, and how
//! authors usually terminate branches early).
//!
//! # Design
//!
//! - The tree and the runner are separate types: the tree is shared static
//!   content, the runner is per-session cursor + score state.
//! - `max_score` is computed at [`initialize`](DialogueRunner::initialize)
//!   time by a cycle-safe walk that counts each reachable node once, taking
//!   its single best choice. Branching means one playthrough usually cannot
//!   collect every node's best, so the ratio rewards good answers on the
//!   path actually taken.
//! - A fresh runner is complete with score zero until initialized; every
//!   query on it returns a safe default.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifies a node within one dialogue tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogueId(String);

impl DialogueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DialogueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DialogueId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for DialogueId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for DialogueId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tree content
// ---------------------------------------------------------------------------

/// One selectable option on a dialogue node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// What the trainee says.
    pub text: String,

    /// What the other party answers.
    pub response: String,

    /// Where this choice leads. `None` falls back to the node's own `next`.
    pub next: Option<DialogueId>,

    /// Diagnostic value of asking this. Zero for filler.
    pub points: u32,
}

/// One node of authored dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueNode {
    /// Unique within the tree.
    pub id: DialogueId,

    /// Speaker text shown when the cursor lands here.
    pub prompt: String,

    /// Options presented to the trainee. Empty for plain narration nodes,
    /// which are stepped over with [`DialogueRunner::advance`].
    pub choices: Vec<Choice>,

    /// Default advancement: used by choiceless nodes, and by choices whose
    /// own `next` is `None`.
    pub next: Option<DialogueId>,
}

/// Errors from dialogue construction and traversal.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("duplicate dialogue node id: {0}")]
    DuplicateId(DialogueId),

    #[error("dialogue node not found: {0}")]
    UnknownNode(DialogueId),

    #[error("choice index {index} out of range ({available} available)")]
    InvalidChoice { index: usize, available: usize },

    #[error("dialogue is already complete")]
    Complete,
}

/// Immutable, authored dialogue content. The root is the first node given
/// to [`build`](Self::build).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTree {
    nodes: HashMap<DialogueId, DialogueNode>,
    /// Node ids in authored order; the first entry is the root.
    order: Vec<DialogueId>,
}

impl DialogueTree {
    /// Index the given nodes. Duplicate ids are an authoring error.
    pub fn build(nodes: Vec<DialogueNode>) -> Result<Self, DialogueError> {
        let mut tree = Self {
            nodes: HashMap::with_capacity(nodes.len()),
            order: Vec::with_capacity(nodes.len()),
        };
        for node in nodes {
            if tree.nodes.contains_key(&node.id) {
                return Err(DialogueError::DuplicateId(node.id));
            }
            tree.order.push(node.id.clone());
            tree.nodes.insert(node.id.clone(), node);
        }
        Ok(tree)
    }

    /// Entry point of the dialogue; `None` only for an empty tree.
    pub fn root(&self) -> Option<&DialogueId> {
        self.order.first()
    }

    pub fn node(&self, id: &str) -> Option<&DialogueNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in authored order.
    pub fn node_ids(&self) -> &[DialogueId] {
        &self.order
    }

    /// Authoring lint: every `next` reference (node-level and per-choice)
    /// that resolves to no node, in first-seen order. Dangling references
    /// are legal at runtime -- they terminate the dialogue -- but usually
    /// mean a typo or an unfinished branch.
    pub fn dangling_references(&self) -> Vec<DialogueId> {
        let mut seen: HashSet<DialogueId> = HashSet::new();
        let mut dangling = Vec::new();
        for id in &self.order {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            let refs = node
                .choices
                .iter()
                .filter_map(|c| c.next.as_ref())
                .chain(node.next.as_ref());
            for next in refs {
                if !self.nodes.contains_key(next.as_str()) && seen.insert(next.clone()) {
                    dangling.push(next.clone());
                }
            }
        }
        dangling
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// One selection made during a session, for post-hoc review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Node the choice was made on.
    pub node: DialogueId,
    /// Index of the chosen option.
    pub choice: usize,
    /// Points it earned.
    pub points: u32,
}

// ---------------------------------------------------------------------------
// DialogueRunner
// ---------------------------------------------------------------------------

/// Per-session cursor and score over a shared [`DialogueTree`].
///
/// The runner never stores or mutates tree content; every traversal method
/// takes the tree by reference, so one authored tree serves any number of
/// concurrent sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueRunner {
    current: Option<DialogueId>,
    score: u32,
    max_score: u32,
    complete: bool,
    transcript: Vec<TranscriptEntry>,
}

impl Default for DialogueRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogueRunner {
    /// A runner that has not seen a tree yet: complete, score zero.
    pub fn new() -> Self {
        Self {
            current: None,
            score: 0,
            max_score: 0,
            complete: true,
            transcript: Vec::new(),
        }
    }

    /// Point the cursor at the tree's root and reset score, transcript, and
    /// the precomputed `max_score`. An empty tree completes immediately.
    pub fn initialize(&mut self, tree: &DialogueTree) {
        self.score = 0;
        self.transcript.clear();
        self.max_score = best_path_score(tree);
        match tree.root() {
            Some(root) => {
                self.current = Some(root.clone());
                self.complete = false;
            }
            None => {
                self.current = None;
                self.complete = true;
            }
        }
    }

    // -- traversal ---------------------------------------------------------------

    /// Pick option `index` on the current node. Earns the choice's points,
    /// records a transcript entry, advances the cursor, and returns the
    /// other party's response text.
    ///
    /// The cursor moves to the choice's `next`, falling back to the node's
    /// `next`; if the resolved target is `None` or not in the tree, the
    /// dialogue completes.
    pub fn select_choice<'t>(
        &mut self,
        tree: &'t DialogueTree,
        index: usize,
    ) -> Result<&'t str, DialogueError> {
        if self.complete {
            return Err(DialogueError::Complete);
        }
        let Some(current) = self.current.clone() else {
            self.complete = true;
            return Err(DialogueError::Complete);
        };
        let Some(node) = tree.node(current.as_str()) else {
            debug!(node = %current, "cursor names a node missing from this tree");
            self.complete = true;
            return Err(DialogueError::UnknownNode(current));
        };
        let Some(choice) = node.choices.get(index) else {
            return Err(DialogueError::InvalidChoice {
                index,
                available: node.choices.len(),
            });
        };

        self.score += choice.points;
        self.transcript.push(TranscriptEntry {
            node: current,
            choice: index,
            points: choice.points,
        });
        self.step_to(tree, choice.next.as_ref().or(node.next.as_ref()));
        Ok(&choice.response)
    }

    /// Step over a choiceless node, following its `next`. Returns false and
    /// does nothing when the node has choices (use
    /// [`select_choice`](Self::select_choice)) or the dialogue is complete.
    pub fn advance(&mut self, tree: &DialogueTree) -> bool {
        if self.complete {
            return false;
        }
        let Some(current) = self.current.clone() else {
            self.complete = true;
            return true;
        };
        let Some(node) = tree.node(current.as_str()) else {
            debug!(node = %current, "cursor names a node missing from this tree");
            self.current = None;
            self.complete = true;
            return true;
        };
        if !node.choices.is_empty() {
            return false;
        }
        self.step_to(tree, node.next.as_ref());
        true
    }

    fn step_to(&mut self, tree: &DialogueTree, next: Option<&DialogueId>) {
        match next {
            Some(id) if tree.contains(id.as_str()) => self.current = Some(id.clone()),
            Some(id) => {
                debug!(next = %id, "next reference not in tree; dialogue complete");
                self.current = None;
                self.complete = true;
            }
            None => {
                self.current = None;
                self.complete = true;
            }
        }
    }

    // -- queries -----------------------------------------------------------------

    /// Node the cursor is on, if the dialogue is still going.
    pub fn current_node<'t>(&self, tree: &'t DialogueTree) -> Option<&'t DialogueNode> {
        self.current.as_ref().and_then(|id| tree.node(id.as_str()))
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Upper bound used by [`diagnostic_ratio`](Self::diagnostic_ratio);
    /// fixed at initialization.
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Selections made this session, in order.
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Score earned as a fraction of `max_score`, clamped to `[0, 1]`.
    /// Zero when there was nothing to earn.
    pub fn diagnostic_ratio(&self) -> f32 {
        if self.max_score == 0 {
            return 0.0;
        }
        (self.score as f32 / self.max_score as f32).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Scoring walk
// ---------------------------------------------------------------------------

/// Sum, over every node reachable from the root, of that node's single
/// highest choice value. The visited set makes cycles safe and counts each
/// node at most once; dangling references contribute nothing.
fn best_path_score(tree: &DialogueTree) -> u32 {
    let Some(root) = tree.root() else {
        return 0;
    };
    let mut visited: HashSet<DialogueId> = HashSet::new();
    let mut stack: Vec<DialogueId> = vec![root.clone()];
    visited.insert(root.clone());

    let mut total = 0u32;
    while let Some(id) = stack.pop() {
        let Some(node) = tree.node(id.as_str()) else {
            continue;
        };
        total += node.choices.iter().map(|c| c.points).max().unwrap_or(0);

        for next in node
            .choices
            .iter()
            .filter_map(|c| c.next.as_ref())
            .chain(node.next.as_ref())
        {
            if visited.insert(next.clone()) {
                stack.push(next.clone());
            }
        }
    }
    total
}

// ===========================================================================
// Tests
// ===========================================================================
