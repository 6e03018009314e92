//! Arena of primary and derived variables.

use fv_core::{Real, VarId};
use fv_mesh::Mesh;

use crate::error::{VarError, VarResult};
use crate::expr::Expr;
use crate::field::{Field, Location, component_count};

#[derive(Debug)]
enum NodeKind {
    Primary {
        generation: u64,
    },
    Derived {
        expr: Expr,
        /// Stamp the cached value was computed at; `None` before first use.
        cached_stamp: Option<u64>,
    },
}

#[derive(Debug)]
struct Node {
    name: String,
    location: Location,
    elem_shape: Vec<usize>,
    kind: NodeKind,
    value: Option<Field>,
    old: Option<VarId>,
    evaluations: u64,
}

/// Variable dependency graph over one mesh.
///
/// Primary nodes hold values written by the caller (or by an equation after
/// a solve). Derived nodes hold an `Expr` over earlier nodes and recompute
/// lazily: a read refreshes the node only if a transitive requirement was
/// written since the cached evaluation.
pub struct VarGraph<'m> {
    mesh: &'m dyn Mesh,
    nodes: Vec<Node>,
    clock: u64,
}

impl std::fmt::Debug for VarGraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarGraph")
            .field("cells", &self.mesh.cell_count())
            .field("faces", &self.mesh.face_count())
            .field("nodes", &self.nodes.len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl<'m> VarGraph<'m> {
    pub fn new(mesh: &'m dyn Mesh) -> Self {
        Self {
            mesh,
            nodes: Vec::new(),
            clock: 0,
        }
    }

    pub fn mesh(&self) -> &'m dyn Mesh {
        self.mesh
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn entity_count(&self, location: Location) -> usize {
        match location {
            Location::Cell => self.mesh.cell_count(),
            Location::Face => self.mesh.face_count(),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn node(&self, id: VarId) -> VarResult<&Node> {
        self.nodes.get(id.index()).ok_or(VarError::UnknownVar { id })
    }

    fn node_mut(&mut self, id: VarId) -> VarResult<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or(VarError::UnknownVar { id })
    }

    fn push(&mut self, node: Node) -> VarResult<VarId> {
        let id = VarId::try_from_index(self.nodes.len()).ok_or(VarError::ArenaFull)?;
        self.nodes.push(node);
        Ok(id)
    }

    /// Scalar cell variable with a uniform initial value.
    pub fn cell_var(&mut self, name: impl Into<String>, value: Real) -> VarResult<VarId> {
        let n = self.mesh.cell_count();
        self.primary(name, Location::Cell, vec![], vec![value; n])
    }

    /// Scalar face variable with a uniform initial value.
    pub fn face_var(&mut self, name: impl Into<String>, value: Real) -> VarResult<VarId> {
        let n = self.mesh.face_count();
        self.primary(name, Location::Face, vec![], vec![value; n])
    }

    /// Primary variable of any element shape; `values` is component-major.
    pub fn primary(
        &mut self,
        name: impl Into<String>,
        location: Location,
        elem_shape: Vec<usize>,
        values: Vec<Real>,
    ) -> VarResult<VarId> {
        let len = self.entity_count(location);
        let field = Field::new(location, elem_shape.clone(), len, values)?;
        let generation = self.tick();
        self.push(Node {
            name: name.into(),
            location,
            elem_shape,
            kind: NodeKind::Primary { generation },
            value: Some(field),
            old: None,
            evaluations: 0,
        })
    }

    /// Register a derived node. Requirements must already exist, which keeps
    /// every edge pointing at a lower index.
    pub(crate) fn derived(
        &mut self,
        name: String,
        location: Location,
        elem_shape: Vec<usize>,
        expr: Expr,
    ) -> VarResult<VarId> {
        for req in expr.requires() {
            self.node(req)?;
        }
        self.push(Node {
            name,
            location,
            elem_shape,
            kind: NodeKind::Derived {
                expr,
                cached_stamp: None,
            },
            value: None,
            old: None,
            evaluations: 0,
        })
    }

    fn primary_mut(&mut self, id: VarId) -> VarResult<&mut Node> {
        let node = self.node_mut(id)?;
        match node.kind {
            NodeKind::Primary { .. } => Ok(node),
            NodeKind::Derived { .. } => Err(VarError::Derived {
                name: node.name.clone(),
            }),
        }
    }

    fn bump(&mut self, id: VarId) -> VarResult<()> {
        let generation = self.tick();
        if let NodeKind::Primary { generation: g } = &mut self.node_mut(id)?.kind {
            *g = generation;
        }
        Ok(())
    }

    /// Overwrite every value of a primary variable.
    pub fn set_value(&mut self, id: VarId, values: Vec<Real>) -> VarResult<()> {
        let node = self.primary_mut(id)?;
        let current = node
            .value
            .as_ref()
            .ok_or_else(|| VarError::NotEvaluated {
                name: node.name.clone(),
            })?;
        let field = Field::new(
            current.location(),
            current.elem_shape().to_vec(),
            current.len(),
            values,
        )?;
        node.value = Some(field);
        self.bump(id)
    }

    pub fn set_uniform(&mut self, id: VarId, value: Real) -> VarResult<()> {
        let node = self.primary_mut(id)?;
        if let Some(field) = node.value.as_mut() {
            field.data_mut().fill(value);
        }
        self.bump(id)
    }

    /// Assign `value` to the listed entities, in every element component.
    pub fn set_where(&mut self, id: VarId, value: Real, indices: &[usize]) -> VarResult<()> {
        let node = self.primary_mut(id)?;
        let name = node.name.clone();
        let Some(field) = node.value.as_mut() else {
            return Err(VarError::NotEvaluated { name });
        };
        let len = field.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(VarError::IndexOob { name, index, len });
        }
        let comps = field.components();
        let data = field.data_mut();
        for c in 0..comps {
            for &i in indices {
                data[c * len + i] = value;
            }
        }
        self.bump(id)
    }

    /// Old-value snapshot of a primary variable, created on first request
    /// with the current value.
    pub fn old(&mut self, id: VarId) -> VarResult<VarId> {
        let node = self.primary_mut(id)?;
        if let Some(old) = node.old {
            return Ok(old);
        }
        let name = format!("{}.old", node.name);
        let location = node.location;
        let elem_shape = node.elem_shape.clone();
        let values = node
            .value
            .as_ref()
            .map(|f| f.data().to_vec())
            .unwrap_or_default();
        let old = self.primary(name, location, elem_shape, values)?;
        self.node_mut(id)?.old = Some(old);
        Ok(old)
    }

    pub fn old_of(&self, id: VarId) -> Option<VarId> {
        self.nodes.get(id.index()).and_then(|n| n.old)
    }

    /// Copy the current value into the old snapshot, if one exists.
    pub fn update_old(&mut self, id: VarId) -> VarResult<()> {
        let Some(old) = self.node(id)?.old else {
            return Ok(());
        };
        let values = self.value(id)?.data().to_vec();
        self.set_value(old, values)
    }

    /// Nodes reachable through requirements, ascending by index.
    fn closure(&self, id: VarId) -> VarResult<Vec<usize>> {
        self.node(id)?;
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![id.index()];
        let mut out = Vec::new();
        while let Some(i) = stack.pop() {
            if seen[i] {
                continue;
            }
            seen[i] = true;
            out.push(i);
            if let NodeKind::Derived { expr, .. } = &self.nodes[i].kind {
                stack.extend(expr.requires().into_iter().map(|r| r.index()));
            }
        }
        out.sort_unstable();
        Ok(out)
    }

    fn requirement_stamp(&self, expr: &Expr, stamps: &[u64]) -> u64 {
        expr.requires()
            .into_iter()
            .map(|r| stamps[r.index()])
            .max()
            .unwrap_or(0)
    }

    /// Bring `id` and everything it depends on up to date.
    pub fn refresh(&mut self, id: VarId) -> VarResult<()> {
        let order = self.closure(id)?;
        let mut stamps = vec![0_u64; self.nodes.len()];

        for i in order {
            let (expr, cached) = match &self.nodes[i].kind {
                NodeKind::Primary { generation } => {
                    stamps[i] = *generation;
                    continue;
                }
                NodeKind::Derived { expr, cached_stamp } => (*expr, *cached_stamp),
            };
            let stamp = self.requirement_stamp(&expr, &stamps);
            stamps[i] = stamp;
            if cached == Some(stamp) && self.nodes[i].value.is_some() {
                continue;
            }

            let node = &self.nodes[i];
            let field = expr.evaluate(self, node.location, &node.elem_shape)?;
            let node = &mut self.nodes[i];
            node.value = Some(field);
            node.evaluations += 1;
            if let NodeKind::Derived { cached_stamp, .. } = &mut node.kind {
                *cached_stamp = Some(stamp);
            }
        }
        Ok(())
    }

    /// Refresh several ids ahead of a shared read.
    pub fn refresh_all(&mut self, ids: &[VarId]) -> VarResult<()> {
        ids.iter().try_for_each(|&id| self.refresh(id))
    }

    /// True if reading `id` would trigger a recomputation.
    pub fn is_stale(&self, id: VarId) -> VarResult<bool> {
        let order = self.closure(id)?;
        let mut stamps = vec![0_u64; self.nodes.len()];
        let mut stale = false;
        for i in order {
            match &self.nodes[i].kind {
                NodeKind::Primary { generation } => stamps[i] = *generation,
                NodeKind::Derived { expr, cached_stamp } => {
                    stamps[i] = self.requirement_stamp(expr, &stamps);
                    stale |= *cached_stamp != Some(stamps[i]);
                }
            }
        }
        Ok(stale)
    }

    /// Refresh then read.
    pub fn value(&mut self, id: VarId) -> VarResult<&Field> {
        self.refresh(id)?;
        self.cached(id)
    }

    /// Read a node that the caller has already refreshed.
    ///
    /// Fails with `NotEvaluated` instead of handing out a stale value.
    pub fn field(&self, id: VarId) -> VarResult<&Field> {
        if self.is_stale(id)? {
            return Err(VarError::NotEvaluated {
                name: self.node(id)?.name.clone(),
            });
        }
        self.cached(id)
    }

    /// Current stored value without a staleness check.
    pub(crate) fn cached(&self, id: VarId) -> VarResult<&Field> {
        let node = self.node(id)?;
        node.value.as_ref().ok_or_else(|| VarError::NotEvaluated {
            name: node.name.clone(),
        })
    }

    pub fn requires(&self, id: VarId) -> VarResult<Vec<VarId>> {
        Ok(match &self.node(id)?.kind {
            NodeKind::Primary { .. } => Vec::new(),
            NodeKind::Derived { expr, .. } => expr.requires(),
        })
    }

    /// Number of times a derived node has been evaluated.
    pub fn evaluations(&self, id: VarId) -> VarResult<u64> {
        Ok(self.node(id)?.evaluations)
    }

    pub fn name(&self, id: VarId) -> VarResult<&str> {
        Ok(&self.node(id)?.name)
    }

    pub fn location(&self, id: VarId) -> VarResult<Location> {
        Ok(self.node(id)?.location)
    }

    pub fn elem_shape(&self, id: VarId) -> VarResult<&[usize]> {
        Ok(&self.node(id)?.elem_shape)
    }

    /// Element component count (1 for scalars).
    pub fn components(&self, id: VarId) -> VarResult<usize> {
        Ok(component_count(&self.node(id)?.elem_shape))
    }

    pub fn is_derived(&self, id: VarId) -> VarResult<bool> {
        Ok(matches!(self.node(id)?.kind, NodeKind::Derived { .. }))
    }
}
