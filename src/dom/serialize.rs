//! Serialization of the arena [`Dom`] through html5ever's HTML serializer.

use std::io;

use html5ever::QualName;
use html5ever::serialize::{Serialize, Serializer, TraversalScope};

use super::arena::{Dom, NodeData, NodeId};

/// A borrowed view of a DOM subtree that html5ever can serialize.
pub struct SerializableNode<'a> {
    pub dom: &'a Dom,
    pub node: NodeId,
}

enum Op {
    Open(NodeId),
    Close(QualName),
}

impl Serialize for SerializableNode<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut ops = match traversal_scope {
            TraversalScope::IncludeNode => vec![Op::Open(self.node)],
            TraversalScope::ChildrenOnly(_) => self.children_ops(self.node),
        };
        ops.reverse();

        while let Some(op) = ops.pop() {
            match op {
                Op::Close(name) => serializer.end_elem(name)?,
                Op::Open(id) => {
                    let Some(node) = self.dom.get(id) else {
                        continue;
                    };
                    match &node.data {
                        NodeData::Element { name, attrs } => {
                            serializer.start_elem(
                                name.clone(),
                                attrs.iter().map(|a| (&a.name, a.value.as_str())),
                            )?;
                            ops.push(Op::Close(name.clone()));
                            let mut children = self.children_ops(id);
                            children.reverse();
                            ops.extend(children);
                        }
                        NodeData::Document => {
                            let mut children = self.children_ops(id);
                            children.reverse();
                            ops.extend(children);
                        }
                        NodeData::Text(text) => serializer.write_text(text)?,
                        NodeData::Comment(text) => serializer.write_comment(text)?,
                        NodeData::Doctype { name } => serializer.write_doctype(name)?,
                        NodeData::ProcessingInstruction { target, data } => {
                            serializer.write_processing_instruction(target, data)?
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl SerializableNode<'_> {
    fn children_ops(&self, id: NodeId) -> Vec<Op> {
        self.dom.children(id).map(Op::Open).collect()
    }
}
