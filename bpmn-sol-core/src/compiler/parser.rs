use super::ir::{FlowEdge, FlowKind, FlowNode, Participant, ProcessGraph};
use anyhow::{anyhow, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// Parse a BPMN 2.0 collaboration diagram into a `ProcessGraph`.
///
/// Accepts both prefixed (`bpmn:startEvent`) and default-namespace
/// (`startEvent`) forms. Elements outside the supported set are skipped;
/// a flow referencing a skipped element surfaces as an unknown-ref error
/// when edges are resolved.
pub fn parse_diagram(xml: &str) -> Result<ProcessGraph> {
    let mut reader = Reader::from_str(xml);
    let mut state = ParserState::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => state.open_tag(e, false)?,
            Ok(Event::Empty(ref e)) => state.open_tag(e, true)?,
            Ok(Event::End(ref e)) => {
                let local = local_name(e.name().as_ref());
                state.close_tag(&local)?;
            }
            Ok(Event::Text(ref e)) => {
                if let Ok(text) = e.unescape() {
                    state.text(text.trim());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("XML parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    state.finish()
}

/// Activity tags all mapped to `FlowNode::Task`.
const TASK_TAGS: &[&str] = &[
    "task",
    "userTask",
    "serviceTask",
    "sendTask",
    "receiveTask",
    "scriptTask",
    "manualTask",
    "businessRuleTask",
];

/// A flow collected during the scan, resolved to graph edges at the end.
struct RawFlow {
    id: String,
    kind: FlowKind,
    source: String,
    target: String,
    name: Option<String>,
}

/// An `intermediateCatchEvent` whose children are still being read.
struct PendingCatch {
    id: String,
    name: Option<String>,
    process_id: String,
    has_timer: bool,
    payload: Option<String>,
}

#[derive(Default)]
struct ParserState {
    out: ProcessGraph,
    node_map: HashMap<String, petgraph::graph::NodeIndex>,
    flows: Vec<RawFlow>,
    current_process: Option<String>,
    pending_catch: Option<PendingCatch>,
    in_timer_child: bool,
}

impl ParserState {
    fn open_tag(&mut self, e: &BytesStart, is_empty: bool) -> Result<()> {
        let local = local_name(e.name().as_ref());

        match local.as_str() {
            "participant" => {
                let id = get_attr(e, "id")?;
                let name = get_attr_opt(e, "name").unwrap_or_else(|| id.clone());
                self.out.participants.push(Participant {
                    id,
                    name,
                    process_ref: get_attr_opt(e, "processRef"),
                });
            }
            "process" => {
                let id = get_attr(e, "id")?;
                self.out.processes.push(id.clone());
                self.current_process = Some(id);
            }
            "startEvent" if self.current_process.is_some() => {
                self.add_node(e, |id, name, process_id| FlowNode::Start {
                    id,
                    name,
                    process_id,
                })?;
            }
            "endEvent" if self.current_process.is_some() => {
                self.add_node(e, |id, name, process_id| FlowNode::End {
                    id,
                    name,
                    process_id,
                })?;
            }
            "exclusiveGateway" if self.current_process.is_some() => {
                self.add_node(e, |id, name, process_id| FlowNode::Gateway {
                    id,
                    name,
                    process_id,
                })?;
            }
            t if TASK_TAGS.contains(&t) && self.current_process.is_some() => {
                self.add_node(e, |id, name, process_id| FlowNode::Task {
                    id,
                    name,
                    process_id,
                })?;
            }
            "intermediateCatchEvent" if self.current_process.is_some() => {
                let id = get_attr(e, "id")?;
                let name = get_attr_opt(e, "name");
                let process_id = self.current_process.clone().unwrap_or_default();
                if is_empty {
                    // No children, so no timer definition.
                    self.insert(FlowNode::CatchEvent {
                        id,
                        name,
                        process_id,
                    })?;
                } else {
                    self.pending_catch = Some(PendingCatch {
                        id,
                        name,
                        process_id,
                        has_timer: false,
                        payload: None,
                    });
                }
            }
            "timerEventDefinition" => {
                if let Some(pending) = self.pending_catch.as_mut() {
                    pending.has_timer = true;
                }
            }
            "timeDuration" | "timeDate" | "timeCycle" => {
                if self.pending_catch.is_some() && !is_empty {
                    self.in_timer_child = true;
                }
            }
            "sequenceFlow" => self.collect_flow(e, FlowKind::Sequence)?,
            "messageFlow" => self.collect_flow(e, FlowKind::Message)?,
            _ => {}
        }
        Ok(())
    }

    fn close_tag(&mut self, local: &str) -> Result<()> {
        match local {
            "process" => self.current_process = None,
            "intermediateCatchEvent" => {
                if let Some(pending) = self.pending_catch.take() {
                    let node = if pending.has_timer {
                        FlowNode::Timer {
                            id: pending.id,
                            name: pending.name,
                            process_id: pending.process_id,
                            payload: pending.payload,
                        }
                    } else {
                        FlowNode::CatchEvent {
                            id: pending.id,
                            name: pending.name,
                            process_id: pending.process_id,
                        }
                    };
                    self.insert(node)?;
                }
            }
            "timeDuration" | "timeDate" | "timeCycle" => self.in_timer_child = false,
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.in_timer_child && !text.is_empty() {
            if let Some(pending) = self.pending_catch.as_mut() {
                pending.payload = Some(text.to_string());
            }
        }
    }

    fn add_node(
        &mut self,
        e: &BytesStart,
        make: impl FnOnce(String, Option<String>, String) -> FlowNode,
    ) -> Result<()> {
        let id = get_attr(e, "id")?;
        let name = get_attr_opt(e, "name");
        let process_id = self.current_process.clone().unwrap_or_default();
        self.insert(make(id, name, process_id))
    }

    fn insert(&mut self, node: FlowNode) -> Result<()> {
        let id = node.id().to_string();
        if self.node_map.contains_key(&id) {
            return Err(anyhow!("duplicate element id '{}'", id));
        }
        let idx = self.out.graph.add_node(node);
        self.node_map.insert(id, idx);
        Ok(())
    }

    fn collect_flow(&mut self, e: &BytesStart, kind: FlowKind) -> Result<()> {
        self.flows.push(RawFlow {
            id: get_attr(e, "id")?,
            kind,
            source: get_attr(e, "sourceRef")?,
            target: get_attr(e, "targetRef")?,
            name: get_attr_opt(e, "name"),
        });
        Ok(())
    }

    fn finish(mut self) -> Result<ProcessGraph> {
        let participant_ids: Vec<&str> =
            self.out.participants.iter().map(|p| p.id.as_str()).collect();

        for flow in self.flows {
            // Pool-level message flows target a participant rather than an
            // element; they carry no per-element semantics, so drop them.
            if flow.kind == FlowKind::Message
                && (participant_ids.contains(&flow.source.as_str())
                    || participant_ids.contains(&flow.target.as_str()))
            {
                tracing::warn!(
                    flow = %flow.id,
                    "message flow attached to a pool, not an element; skipping"
                );
                continue;
            }

            let from = self.node_map.get(&flow.source).ok_or_else(|| {
                anyhow!(
                    "flow '{}' references unknown sourceRef '{}'",
                    flow.id,
                    flow.source
                )
            })?;
            let to = self.node_map.get(&flow.target).ok_or_else(|| {
                anyhow!(
                    "flow '{}' references unknown targetRef '{}'",
                    flow.id,
                    flow.target
                )
            })?;
            self.out.graph.add_edge(
                *from,
                *to,
                FlowEdge {
                    id: flow.id,
                    kind: flow.kind,
                    name: flow.name,
                },
            );
        }

        Ok(self.out)
    }
}

// ─── Tag and attribute helpers ────────────────────────────────

fn local_name(qname: &[u8]) -> String {
    let s = String::from_utf8_lossy(qname);
    s.rsplit(':').next().unwrap_or(&s).to_string()
}

fn get_attr(e: &BytesStart, key: &str) -> Result<String> {
    get_attr_opt(e, key).ok_or_else(|| {
        anyhow!(
            "<{}> missing required attribute '{}'",
            String::from_utf8_lossy(e.name().as_ref()),
            key
        )
    })
}

fn get_attr_opt(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| local_name(a.key.as_ref()) == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}
