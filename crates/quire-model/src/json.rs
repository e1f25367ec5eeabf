//! JSON form of documents: `{type, attrs, content, marks, text}` objects.

use serde_json::{Map, Value, json};

use crate::attrs::{AttrValue, Attrs};
use crate::error::JsonError;
use crate::mark::Mark;
use crate::node::Node;
use crate::schema::Schema;

fn attrs_to_json(attrs: &Attrs) -> Value {
    let map: Map<String, Value> = attrs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::to_value(v).unwrap_or(Value::Null)))
        .collect();
    Value::Object(map)
}

fn attrs_from_json(value: Option<&Value>) -> Result<Attrs, JsonError> {
    match value {
        None | Some(Value::Null) => Ok(Attrs::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| {
                let value: AttrValue = serde_json::from_value(v.clone())?;
                Ok((k.as_str().into(), value))
            })
            .collect(),
        Some(other) => Err(JsonError::Malformed(format!("attrs must be an object, got {other}"))),
    }
}

fn mark_to_json(mark: &Mark) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), json!(mark.ty.name.as_str()));
    if !mark.attrs.is_empty() {
        obj.insert("attrs".into(), attrs_to_json(&mark.attrs));
    }
    Value::Object(obj)
}

impl Node {
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), json!(self.type_name()));
        if !self.attrs().is_empty() {
            obj.insert("attrs".into(), attrs_to_json(self.attrs()));
        }
        if let Some(text) = self.text() {
            obj.insert("text".into(), json!(text));
        }
        if !self.content().is_empty() {
            let children: Vec<Value> = self.content().iter().map(Node::to_json).collect();
            obj.insert("content".into(), Value::Array(children));
        }
        if !self.marks().is_empty() {
            let marks: Vec<Value> = self.marks().iter().map(mark_to_json).collect();
            obj.insert("marks".into(), Value::Array(marks));
        }
        Value::Object(obj)
    }
}

impl Schema {
    /// Build and validate a document from its JSON form.
    pub fn node_from_json(&self, value: &Value) -> Result<Node, JsonError> {
        let node = self.node_from_value(value)?;
        node.check()?;
        Ok(node)
    }

    /// Parse a JSON string into a document.
    pub fn node_from_json_str(&self, text: &str) -> Result<Node, JsonError> {
        let value: Value = serde_json::from_str(text)?;
        self.node_from_json(&value)
    }

    fn node_from_value(&self, value: &Value) -> Result<Node, JsonError> {
        let obj = value
            .as_object()
            .ok_or_else(|| JsonError::Malformed(format!("expected a node object, got {value}")))?;
        let type_name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| JsonError::Malformed("node without a type".into()))?;
        let ty = self
            .node_type(type_name)
            .ok_or_else(|| JsonError::UnknownNodeType(type_name.to_owned()))?;

        let mut marks: Vec<Mark> = Vec::new();
        if let Some(list) = obj.get("marks") {
            let list = list
                .as_array()
                .ok_or_else(|| JsonError::Malformed("marks must be an array".into()))?;
            for m in list {
                let name = m
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| JsonError::Malformed("mark without a type".into()))?;
                let mark_type = self
                    .mark_type(name)
                    .ok_or_else(|| JsonError::UnknownMarkType(name.to_owned()))?;
                let mark = mark_type.create(&attrs_from_json(m.get("attrs"))?)?;
                marks = mark.add_to_set(&marks);
            }
        }

        if ty.is_text() {
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonError::Malformed("text node without text".into()))?;
            return Ok(self.text(text, marks)?);
        }

        let mut children = Vec::new();
        if let Some(content) = obj.get("content") {
            let content = content
                .as_array()
                .ok_or_else(|| JsonError::Malformed("content must be an array".into()))?;
            for child in content {
                children.push(self.node_from_value(child)?);
            }
        }
        let attrs = attrs_from_json(obj.get("attrs"))?;
        Ok(ty.create(&attrs, children, marks)?)
    }
}
