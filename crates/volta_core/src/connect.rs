//! Connection bookkeeping and resolution.
//!
//! `connect` calls accumulate ports into [`Connection`]s owned by the block
//! being built. When the block is emitted, each connection resolves to
//! nothing, an export, or an inferred link with one slot per joined port and
//! a bridge for every boundary port.

use crate::block::BlockKind;
use crate::builder::{instantiate_child, path_key};
use crate::context::{BuildContext, ChildRole, Connection};
use crate::error::{BuildError, BuildResult};
use crate::ids::{BlockId, PortId};
use volta_ir::{LocalPath, LocalStep, ValueExpr};

/// Adds `ports` to the connection of `block` that already holds any of
/// them, merging every connection they touch into the earliest one.
pub(crate) fn add_connection(
    ctx: &mut BuildContext,
    block: BlockId,
    ports: &[PortId],
    flatten: bool,
    name: Option<&str>,
) -> BuildResult<()> {
    let class = ctx.blocks[block].class.clone();
    for &port in ports {
        if ctx.port_path(block, port).is_none() {
            return Err(BuildError::InaccessiblePort {
                port: ctx.port_label(port),
                class,
            });
        }
    }
    let mut joined: Vec<PortId> = Vec::with_capacity(ports.len());
    for &port in ports {
        if !joined.contains(&port) {
            joined.push(port);
        }
    }

    let connections = &mut ctx.blocks[block].connections;
    let touched: Vec<usize> = connections
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.absorbed && c.ports.iter().any(|p| joined.contains(p)))
        .map(|(i, _)| i)
        .collect();
    let target = match touched.first() {
        Some(&first) => first,
        None => {
            connections.push(Connection {
                flatten,
                ..Connection::default()
            });
            connections.len() - 1
        }
    };

    let mut incoming = vec![Connection {
        ports: Vec::new(),
        flatten,
        name: name.map(str::to_string),
        absorbed: false,
    }];
    for &other in touched.iter().skip(1) {
        let absorbed = std::mem::take(&mut connections[other]);
        connections[other].absorbed = true;
        incoming.insert(incoming.len() - 1, absorbed);
    }
    for other in incoming {
        let current = &mut connections[target];
        if other.flatten != current.flatten {
            return Err(BuildError::structural(
                class,
                "cannot merge flattened and unflattened connections",
            ));
        }
        if let Some(b) = other.name {
            if let Some(a) = current.name.as_ref().filter(|a| **a != b) {
                return Err(BuildError::structural(
                    class,
                    format!("connection is named both {a} and {b}"),
                ));
            }
            current.name.get_or_insert(b);
        }
        for port in other.ports {
            if !current.ports.contains(&port) {
                current.ports.push(port);
            }
        }
    }
    let current = &mut connections[target];
    for port in joined {
        if !current.ports.contains(&port) {
            current.ports.push(port);
        }
    }
    Ok(())
}

/// The IR produced by resolving the connections of one block.
#[derive(Default)]
pub(crate) struct Resolved {
    /// Inferred links: name, instance, and whether it is a link array.
    pub links: Vec<(String, BlockId, bool)>,
    /// Export and connection constraints in emission order.
    pub constraints: Vec<(String, ValueExpr)>,
}

struct Joined {
    port: PortId,
    /// The port whose type joins the link: the port itself or its bridge's `inner_link`.
    facing: PortId,
    /// Bridge instance and its `outer_port`.
    bridge: Option<PortId>,
    vector: bool,
}

struct Resolver<'c> {
    ctx: &'c mut BuildContext,
    block: BlockId,
    out: Resolved,
}

impl Resolver<'_> {
    fn path(&self, port: PortId) -> BuildResult<LocalPath> {
        self.ctx
            .port_path(self.block, port)
            .ok_or_else(|| BuildError::InaccessiblePort {
                port: self.ctx.port_label(port),
                class: self.ctx.blocks[self.block].class.clone(),
            })
    }

    fn class(&self) -> String {
        self.ctx.blocks[self.block].class.clone()
    }

    fn is_link_parent(&self) -> bool {
        self.ctx.blocks[self.block].kind == BlockKind::Link
    }

    fn is_boundary(&self, port: PortId) -> bool {
        self.ctx.port_owner(port) == Some(self.block)
    }

    fn check_free_name(&self, name: &str) -> BuildResult<()> {
        let node = &self.ctx.blocks[self.block];
        let taken = node.params.contains_key(name)
            || node.ports.contains_key(name)
            || node.blocks.contains_key(name)
            || self.out.links.iter().any(|(n, _, _)| n == name);
        if taken {
            Err(BuildError::structural(
                self.class(),
                format!("connection name {name} is already in use"),
            ))
        } else {
            Ok(())
        }
    }

    fn resolve(&mut self, conn: Connection) -> BuildResult<()> {
        let ports = conn.ports;
        let Some(&first) = ports.first() else {
            return Ok(());
        };
        let first_vector = self.ctx.ports[first].vector;
        if ports.len() == 1 && !(conn.flatten && first_vector) {
            return Ok(());
        }
        let name = match conn.name {
            Some(name) => name,
            None => format!("_{}_link", path_key(&self.path(first)?)),
        };
        if ports.len() == 2 && !self.is_link_parent() && self.try_export(&name, &ports)? {
            return Ok(());
        }
        self.resolve_link(&name, &ports, conn.flatten)
    }

    /// Emits an export if the two ports are one boundary and one interior
    /// port of the same type.
    fn try_export(&mut self, name: &str, ports: &[PortId]) -> BuildResult<bool> {
        let (a, b) = (ports[0], ports[1]);
        let (outer, inner) = match (self.is_boundary(a), self.is_boundary(b)) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => return Ok(false),
        };
        let (o, i) = (&self.ctx.ports[outer], &self.ctx.ports[inner]);
        if o.class != i.class || o.vector != i.vector {
            return Ok(false);
        }
        if !self.ctx.port_initializers(outer).is_empty() {
            return Err(BuildError::BoundaryInitializer {
                port: self.ctx.port_label(outer),
            });
        }
        let exterior_port = self.path(outer)?;
        let internal_block_port = self.path(inner)?;
        let expr = if self.ctx.ports[outer].vector {
            ValueExpr::ExportedArray {
                exterior_port,
                internal_block_port,
            }
        } else {
            ValueExpr::Exported {
                exterior_port,
                internal_block_port,
            }
        };
        self.out.constraints.push((format!("(conn){name}"), expr));
        Ok(true)
    }

    fn join(&mut self, port: PortId) -> BuildResult<Joined> {
        let node = &self.ctx.ports[port];
        let vector = node.vector;
        if self.is_link_parent() || !self.is_boundary(port) {
            return Ok(Joined {
                port,
                facing: port,
                bridge: None,
                vector,
            });
        }
        if vector {
            return Err(BuildError::Unconnectable {
                port: self.ctx.port_label(port),
                reason: "vector boundary ports can only be exported".into(),
            });
        }
        let Some(bridge_def) = node.template.bridge_type() else {
            return Err(BuildError::MissingBridge {
                port: self.ctx.port_label(port),
                port_class: node.class.clone(),
            });
        };
        if bridge_def.kind() != BlockKind::Bridge {
            return Err(BuildError::structural(
                bridge_def.class_name(),
                "bridge definitions must be of bridge kind",
            ));
        }
        let bridge_name = format!("(bridge){}", path_key(&self.path(port)?));
        self.check_free_name(&bridge_name)?;
        let (bridge, _) =
            instantiate_child(self.ctx, self.block, &bridge_name, bridge_def, ChildRole::Block)?;
        let bridge_port = |name: &str| {
            self.ctx.blocks[bridge]
                .ports
                .get(name)
                .copied()
                .ok_or_else(|| {
                    BuildError::structural(
                        self.ctx.blocks[bridge].class.clone(),
                        format!("bridges must declare port {name}"),
                    )
                })
        };
        let outer = bridge_port("outer_port")?;
        let inner = bridge_port("inner_link")?;
        Ok(Joined {
            port,
            facing: inner,
            bridge: Some(outer),
            vector: false,
        })
    }

    fn resolve_link(&mut self, name: &str, ports: &[PortId], flatten: bool) -> BuildResult<()> {
        let joined = ports
            .iter()
            .map(|port| self.join(*port))
            .collect::<BuildResult<Vec<_>>>()?;

        let mut link_def = None;
        let mut link_classes: Vec<String> = Vec::new();
        for j in &joined {
            let facing = &self.ctx.ports[j.facing];
            let Some(def) = facing.template.link_type() else {
                return Err(BuildError::Unconnectable {
                    port: self.ctx.port_label(j.port),
                    reason: format!("{} has no link type", facing.class),
                });
            };
            let class = def.class_name();
            if !link_classes.contains(&class) {
                link_classes.push(class);
            }
            link_def.get_or_insert(def);
        }
        if link_classes.len() > 1 {
            return Err(BuildError::AmbiguousLink {
                ports: joined
                    .iter()
                    .map(|j| self.ctx.port_label(j.port))
                    .collect::<Vec<_>>()
                    .join(", "),
                classes: link_classes.join(", "),
            });
        }
        let Some(link_def) = link_def else {
            return Ok(());
        };

        let array = !flatten && joined.iter().any(|j| j.vector);
        if let Some(single) = joined.iter().find(|j| array && !j.vector) {
            return Err(BuildError::Unconnectable {
                port: self.ctx.port_label(single.port),
                reason: "cannot join vector and single ports without flatten".into(),
            });
        }

        self.check_free_name(name)?;
        let link_class = link_def.class_name();
        let (link, _) = instantiate_child(self.ctx, self.block, name, link_def, ChildRole::Link)?;
        if self.ctx.blocks[link].kind != BlockKind::Link {
            return Err(BuildError::structural(
                link_class,
                "link types must be of link kind",
            ));
        }
        log::debug!(
            "{}: connection {name} joins {} ports through {link_class}",
            self.class(),
            joined.len()
        );

        let slots: Vec<(String, PortId)> = self.ctx.blocks[link]
            .ports
            .iter()
            .map(|(n, p)| (n.clone(), *p))
            .collect();
        let mut used = vec![false; slots.len()];
        for (idx, j) in joined.iter().enumerate() {
            let facing_class = self.ctx.ports[j.facing].class.clone();
            let needs_vector_slot = j.vector && flatten;
            let slot = slots.iter().enumerate().position(|(i, (_, slot))| {
                let slot = &self.ctx.ports[*slot];
                slot.class == facing_class && (slot.vector || !used[i])
            });
            let Some(slot) = slot else {
                return Err(BuildError::Unconnectable {
                    port: self.ctx.port_label(j.port),
                    reason: format!("no free {facing_class} port on link {link_class}"),
                });
            };
            let (slot_name, slot_port) = &slots[slot];
            if needs_vector_slot && !self.ctx.ports[*slot_port].vector {
                return Err(BuildError::Unconnectable {
                    port: self.ctx.port_label(j.port),
                    reason: format!("cannot connect a vector to the single link port {slot_name}"),
                });
            }
            let mut link_port = LocalPath::names(&[name, slot_name.as_str()]);
            if self.ctx.ports[*slot_port].vector {
                link_port = link_port.with(LocalStep::Allocate(None));
            } else {
                used[slot] = true;
            }
            self.emit_join(name, idx, j, link_port)?;
        }
        self.out.links.push((name.to_string(), link, array));
        Ok(())
    }

    fn emit_join(
        &mut self,
        name: &str,
        idx: usize,
        j: &Joined,
        link_port: LocalPath,
    ) -> BuildResult<()> {
        let port = self.path(j.port)?;
        if self.is_link_parent() {
            let expr = if j.vector {
                ValueExpr::ExportedArray {
                    exterior_port: port,
                    internal_block_port: link_port,
                }
            } else {
                ValueExpr::Exported {
                    exterior_port: port,
                    internal_block_port: link_port,
                }
            };
            self.out
                .constraints
                .push((format!("(export){name}_{idx}"), expr));
            return Ok(());
        }
        if let Some(outer) = j.bridge {
            let outer = self.path(outer)?;
            let inner = self.path(j.facing)?;
            self.out.constraints.push((
                format!("(bridge){name}_b{idx}"),
                ValueExpr::Exported {
                    exterior_port: port,
                    internal_block_port: outer,
                },
            ));
            self.out.constraints.push((
                format!("(conn){name}_b{idx}"),
                ValueExpr::Connected {
                    block_port: inner,
                    link_port,
                },
            ));
            return Ok(());
        }
        let expr = if j.vector {
            ValueExpr::ConnectedArray {
                block_port: port,
                link_port,
            }
        } else {
            ValueExpr::Connected {
                block_port: port,
                link_port,
            }
        };
        self.out
            .constraints
            .push((format!("(conn){name}_d{idx}"), expr));
        Ok(())
    }
}

/// Resolves every open connection of `block`, instantiating the links and
/// bridges they need.
pub(crate) fn resolve(ctx: &mut BuildContext, block: BlockId) -> BuildResult<Resolved> {
    let connections: Vec<Connection> = ctx.blocks[block]
        .connections
        .iter()
        .filter(|c| !c.absorbed)
        .cloned()
        .collect();
    let mut resolver = Resolver {
        ctx,
        block,
        out: Resolved::default(),
    };
    for conn in connections {
        resolver.resolve(conn)?;
    }
    Ok(resolver.out)
}
