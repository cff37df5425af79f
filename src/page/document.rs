use crate::domain::Candidate;

#[derive(Debug, Clone)]
pub enum DomNode {
    Image(Candidate),
    Element { tag: String, children: Vec<DomNode> },
}

impl DomNode {
    pub fn element(tag: impl Into<String>, children: Vec<DomNode>) -> Self {
        DomNode::Element {
            tag: tag.into(),
            children,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            DomNode::Image(_) => "img",
            DomNode::Element { tag, .. } => tag,
        }
    }

    /// The node itself when it is an image, then every descendant image in document order.
    pub fn images(&self) -> Vec<Candidate> {
        let mut found = Vec::new();
        self.collect_images(&mut found);
        found
    }

    fn collect_images(&self, found: &mut Vec<Candidate>) {
        match self {
            DomNode::Image(image) => found.push(image.clone()),
            DomNode::Element { children, .. } => {
                for child in children {
                    child.collect_images(found);
                }
            }
        }
    }
}

/// One structural change: the nodes inserted under a single parent.
#[derive(Debug, Clone, Default)]
pub struct MutationRecord {
    pub added_nodes: Vec<DomNode>,
}

/// Hosts deliver mutations in batches, one notification per batch.
pub type MutationBatch = Vec<MutationRecord>;
