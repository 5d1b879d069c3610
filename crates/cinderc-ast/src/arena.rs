//! The AST arena.
//!
//! All nodes of a package live in one append-only [`Ast`]. Nodes are
//! mutated in place (flags, resolved targets, computed types) but never
//! freed; the whole arena is dropped after the backend has consumed it.
//!
//! The first few slots are seeded singletons: the `Bad` node, every
//! primitive type, and the builtin `str` alias with its `&[u8]` element.
//! Their [`NodeId`]s are compile-time constants, so `NodeId::BOOL` is "the"
//! bool type everywhere.

use cinderc_util::{sym, IndexVec, Loc, Symbol};
use std::ops::{Index, IndexMut};

use crate::flags::NodeFlags;
use crate::node::{
    AliasTypeData, ArrayTypeData, AssignData, BinOpData, CallData, ElemTypeData, FunData,
    FunTypeData, IdData, IfData, ImportData, LocalData, MemberData, Node, NodeId, NodeKind, Op,
    OpData, PlaceholderData, PrimType, StructTypeData, SubscriptData, TemplateTypeData,
    TypeConsData, TypeHeader, UnitData, UnresolvedData,
};

pub struct Ast {
    nodes: IndexVec<NodeId, Node>,
}

impl Ast {
    pub fn new() -> Ast {
        let mut nodes = IndexVec::with_capacity(64);
        let mut seed = |kind: NodeKind, ty: NodeId, flags: NodeFlags| {
            nodes.push(Node { kind, flags, loc: Loc::NONE, nuse: 0, ty })
        };

        let bad = seed(NodeKind::Bad, NodeId::UNKNOWN, NodeFlags::empty());
        debug_assert_eq!(bad, NodeId::BAD);

        for (id, prim) in [
            (NodeId::VOID, PrimType::Void),
            (NodeId::BOOL, PrimType::Bool),
            (NodeId::I8, PrimType::I8),
            (NodeId::I16, PrimType::I16),
            (NodeId::I32, PrimType::I32),
            (NodeId::I64, PrimType::I64),
            (NodeId::INT, PrimType::Int),
            (NodeId::U8, PrimType::U8),
            (NodeId::U16, PrimType::U16),
            (NodeId::U32, PrimType::U32),
            (NodeId::U64, PrimType::U64),
            (NodeId::UINT, PrimType::Uint),
            (NodeId::F32, PrimType::F32),
            (NodeId::F64, PrimType::F64),
            (NodeId::UNKNOWN, PrimType::Unknown),
        ] {
            let got = seed(NodeKind::Prim(prim), id, NodeFlags::CHECKED);
            debug_assert_eq!(got, id);
        }

        // The builtin `str` alias and its `&[u8]` element. Checked lazily so
        // sizes come from the checker's target description.
        let str_slice = seed(
            NodeKind::SliceType(ElemTypeData { elem: NodeId::U8, th: TypeHeader::default() }),
            NodeId::STR_SLICE,
            NodeFlags::empty(),
        );
        debug_assert_eq!(str_slice, NodeId::STR_SLICE);
        let str_alias = seed(
            NodeKind::AliasType(AliasTypeData {
                name: sym::STR,
                elem: NodeId::STR_SLICE,
                th: TypeHeader::default(),
            }),
            NodeId::STR,
            NodeFlags::PUB,
        );
        debug_assert_eq!(str_alias, NodeId::STR);

        Ast { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the arena is never empty; it always holds the seeds
    }

    /// The id the next allocation will get. Used to tell freshly created
    /// nodes apart from pre-existing ones.
    pub fn next_id(&self) -> NodeId {
        self.nodes.next_id()
    }

    /// Allocate a node. Expressions start with type `UNKNOWN`.
    pub fn add(&mut self, kind: NodeKind, loc: Loc) -> NodeId {
        self.nodes.push(Node { kind, flags: NodeFlags::empty(), loc, nuse: 0, ty: NodeId::UNKNOWN })
    }

    /// Allocate a type node; its `ty` points at itself.
    pub fn add_type(&mut self, kind: NodeKind, loc: Loc) -> NodeId {
        let id = self.add(kind, loc);
        self.nodes[id].ty = id;
        id
    }

    /// Shallow clone: the new node shares children with the original.
    /// The use count starts at zero.
    pub fn clone_node(&mut self, n: NodeId) -> NodeId {
        let mut node = self.nodes[n].clone();
        node.nuse = 0;
        let id = self.nodes.push(node);
        if self.nodes[id].is_type() && self.nodes[id].ty == n {
            self.nodes[id].ty = id;
        }
        id
    }

    pub fn get(&self, n: NodeId) -> Option<&Node> {
        self.nodes.get(n)
    }

    pub fn mark_used(&mut self, n: NodeId) {
        self.nodes[n].nuse = self.nodes[n].nuse.saturating_add(1);
    }

    // -- constructor helpers ------------------------------------------------

    pub fn unit(&mut self, imports: Vec<NodeId>, decls: Vec<NodeId>, loc: Loc) -> NodeId {
        self.add(NodeKind::Unit(UnitData { imports, decls }), loc)
    }

    pub fn id(&mut self, name: Symbol, loc: Loc) -> NodeId {
        self.add(NodeKind::Id(IdData { name, target: None }), loc)
    }

    pub fn bool_lit(&mut self, value: bool, loc: Loc) -> NodeId {
        self.add(NodeKind::BoolLit { value }, loc)
    }

    pub fn int_lit(&mut self, value: u64, loc: Loc) -> NodeId {
        self.add(NodeKind::IntLit { value }, loc)
    }

    pub fn float_lit(&mut self, value: f64, loc: Loc) -> NodeId {
        self.add(NodeKind::FloatLit { value }, loc)
    }

    pub fn str_lit(&mut self, bytes: impl Into<Vec<u8>>, loc: Loc) -> NodeId {
        self.add(NodeKind::StrLit { bytes: bytes.into() }, loc)
    }

    pub fn array_lit(&mut self, values: Vec<NodeId>, loc: Loc) -> NodeId {
        self.add(NodeKind::ArrayLit { values }, loc)
    }

    pub fn block(&mut self, children: Vec<NodeId>, loc: Loc) -> NodeId {
        self.add(NodeKind::Block { children }, loc)
    }

    pub fn ret(&mut self, value: Option<NodeId>, loc: Loc) -> NodeId {
        self.add(NodeKind::Return { value }, loc)
    }

    pub fn binop(&mut self, op: Op, left: NodeId, right: NodeId, loc: Loc) -> NodeId {
        self.add(NodeKind::BinOp(BinOpData { op, left, right }), loc)
    }

    pub fn assign(&mut self, op: Op, lhs: NodeId, rhs: NodeId, loc: Loc) -> NodeId {
        self.add(NodeKind::Assign(AssignData { op, lhs, rhs }), loc)
    }

    pub fn prefix_op(&mut self, op: Op, expr: NodeId, loc: Loc) -> NodeId {
        self.add(NodeKind::PrefixOp(OpData { op, expr }), loc)
    }

    pub fn postfix_op(&mut self, op: Op, expr: NodeId, loc: Loc) -> NodeId {
        self.add(NodeKind::PostfixOp(OpData { op, expr }), loc)
    }

    pub fn deref(&mut self, expr: NodeId, loc: Loc) -> NodeId {
        self.add(NodeKind::Deref { expr }, loc)
    }

    pub fn member(&mut self, recv: NodeId, name: Symbol, loc: Loc) -> NodeId {
        self.add(NodeKind::Member(MemberData { recv, name, name_loc: loc, target: None }), loc)
    }

    pub fn subscript(&mut self, recv: NodeId, index: NodeId, loc: Loc) -> NodeId {
        self.add(NodeKind::Subscript(SubscriptData { recv, index, index_val: 0 }), loc)
    }

    pub fn if_expr(
        &mut self,
        cond: NodeId,
        then_block: NodeId,
        else_block: Option<NodeId>,
        loc: Loc,
    ) -> NodeId {
        self.add(NodeKind::If(IfData { cond, then_block, else_block }), loc)
    }

    pub fn call(&mut self, recv: NodeId, args: Vec<NodeId>, loc: Loc) -> NodeId {
        self.add(NodeKind::Call(CallData { recv, args }), loc)
    }

    pub fn type_cons(&mut self, ty: NodeId, args: Vec<NodeId>, loc: Loc) -> NodeId {
        self.add(NodeKind::TypeCons(TypeConsData { ty, args }), loc)
    }

    fn local(name: Symbol, ty: NodeId, init: Option<NodeId>, loc: Loc) -> LocalData {
        LocalData { name, name_loc: loc, ty, init, offset: 0, is_this: false, is_mut: false }
    }

    pub fn var(&mut self, name: Symbol, ty: NodeId, init: Option<NodeId>, loc: Loc) -> NodeId {
        self.add(NodeKind::Var(Self::local(name, ty, init, loc)), loc)
    }

    pub fn let_(&mut self, name: Symbol, ty: NodeId, init: Option<NodeId>, loc: Loc) -> NodeId {
        self.add(NodeKind::Let(Self::local(name, ty, init, loc)), loc)
    }

    pub fn param(&mut self, name: Symbol, ty: NodeId, loc: Loc) -> NodeId {
        self.add(NodeKind::Param(Self::local(name, ty, None, loc)), loc)
    }

    pub fn this_param(&mut self, ty: NodeId, is_mut: bool, loc: Loc) -> NodeId {
        let mut local = Self::local(sym::THIS, ty, None, loc);
        local.is_this = true;
        local.is_mut = is_mut;
        self.add(NodeKind::Param(local), loc)
    }

    pub fn field(&mut self, name: Symbol, ty: NodeId, init: Option<NodeId>, loc: Loc) -> NodeId {
        self.add(NodeKind::Field(Self::local(name, ty, init, loc)), loc)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fun(
        &mut self,
        name: Option<Symbol>,
        recv: Option<NodeId>,
        params: Vec<NodeId>,
        result: NodeId,
        body: Option<NodeId>,
        loc: Loc,
    ) -> NodeId {
        self.add(
            NodeKind::Fun(FunData {
                name,
                name_loc: loc,
                recv,
                params,
                result,
                result_loc: loc,
                body,
                ns_parent: None,
            }),
            loc,
        )
    }

    pub fn typedef(&mut self, name: Symbol, ty: NodeId, loc: Loc) -> NodeId {
        self.add(NodeKind::Typedef { name, ty }, loc)
    }

    pub fn import(&mut self, data: ImportData, loc: Loc) -> NodeId {
        self.add(NodeKind::Import(data), loc)
    }

    pub fn ptr_type(&mut self, elem: NodeId, loc: Loc) -> NodeId {
        self.add_type(NodeKind::PtrType(ElemTypeData { elem, th: TypeHeader::default() }), loc)
    }

    pub fn ref_type(&mut self, elem: NodeId, loc: Loc) -> NodeId {
        self.add_type(NodeKind::RefType(ElemTypeData { elem, th: TypeHeader::default() }), loc)
    }

    pub fn mutref_type(&mut self, elem: NodeId, loc: Loc) -> NodeId {
        self.add_type(NodeKind::MutRefType(ElemTypeData { elem, th: TypeHeader::default() }), loc)
    }

    pub fn slice_type(&mut self, elem: NodeId, loc: Loc) -> NodeId {
        self.add_type(NodeKind::SliceType(ElemTypeData { elem, th: TypeHeader::default() }), loc)
    }

    pub fn mutslice_type(&mut self, elem: NodeId, loc: Loc) -> NodeId {
        self.add_type(NodeKind::MutSliceType(ElemTypeData { elem, th: TypeHeader::default() }), loc)
    }

    pub fn optional_type(&mut self, elem: NodeId, loc: Loc) -> NodeId {
        self.add_type(NodeKind::OptionalType(ElemTypeData { elem, th: TypeHeader::default() }), loc)
    }

    pub fn array_type(&mut self, elem: NodeId, len_expr: Option<NodeId>, loc: Loc) -> NodeId {
        self.add_type(
            NodeKind::ArrayType(ArrayTypeData { elem, len_expr, len: 0, th: TypeHeader::default() }),
            loc,
        )
    }

    pub fn fun_type(&mut self, params: Vec<NodeId>, result: NodeId, loc: Loc) -> NodeId {
        self.add_type(NodeKind::FunType(FunTypeData { params, result, th: TypeHeader::default() }), loc)
    }

    pub fn struct_type(
        &mut self,
        name: Option<Symbol>,
        fields: Vec<NodeId>,
        tparams: Vec<NodeId>,
        loc: Loc,
    ) -> NodeId {
        self.add_type(
            NodeKind::StructType(StructTypeData {
                name,
                fields,
                tparams,
                ns_parent: None,
                th: TypeHeader::default(),
            }),
            loc,
        )
    }

    pub fn alias_type(&mut self, name: Symbol, elem: NodeId, loc: Loc) -> NodeId {
        self.add_type(NodeKind::AliasType(AliasTypeData { name, elem, th: TypeHeader::default() }), loc)
    }

    pub fn template_type(&mut self, recv: NodeId, args: Vec<NodeId>, loc: Loc) -> NodeId {
        self.add_type(
            NodeKind::TemplateType(TemplateTypeData { recv, args, th: TypeHeader::default() }),
            loc,
        )
    }

    pub fn placeholder(&mut self, name: Symbol, default: Option<NodeId>, loc: Loc) -> NodeId {
        self.add_type(NodeKind::Placeholder(PlaceholderData { name, default, th: TypeHeader::default() }), loc)
    }

    pub fn unresolved(&mut self, name: Symbol, loc: Loc) -> NodeId {
        self.add_type(NodeKind::Unresolved(UnresolvedData { name, resolved: None, th: TypeHeader::default() }), loc)
    }

    // -- display ------------------------------------------------------------

    /// Human-readable name of a type, for diagnostics.
    pub fn type_str(&self, t: NodeId) -> String {
        match &self[t].kind {
            NodeKind::Prim(p) => p.name().as_str().to_string(),
            NodeKind::PtrType(d) => format!("*{}", self.type_str(d.elem)),
            NodeKind::RefType(d) => format!("&{}", self.type_str(d.elem)),
            NodeKind::MutRefType(d) => format!("mut&{}", self.type_str(d.elem)),
            NodeKind::SliceType(d) => format!("&[{}]", self.type_str(d.elem)),
            NodeKind::MutSliceType(d) => format!("mut&[{}]", self.type_str(d.elem)),
            NodeKind::OptionalType(d) => format!("?{}", self.type_str(d.elem)),
            NodeKind::ArrayType(d) => format!("[{} {}]", self.type_str(d.elem), d.len),
            NodeKind::FunType(d) => {
                let params: Vec<String> = d
                    .params
                    .iter()
                    .map(|&p| match self[p].local() {
                        Some(l) if l.is_this => "this".to_string(),
                        Some(l) => self.type_str(l.ty),
                        None => self.type_str(p),
                    })
                    .collect();
                format!("fun({}){}", params.join(", "), self.type_str(d.result))
            }
            NodeKind::StructType(d) => match d.name {
                Some(name) => name.as_str().to_string(),
                None => "struct".to_string(),
            },
            NodeKind::AliasType(d) => d.name.as_str().to_string(),
            NodeKind::NsType { .. } => "namespace".to_string(),
            NodeKind::TemplateType(d) => {
                let args: Vec<String> = d.args.iter().map(|&a| self.type_str(a)).collect();
                format!("{}<{}>", self.type_str(d.recv), args.join(", "))
            }
            NodeKind::Placeholder(d) => d.name.as_str().to_string(),
            NodeKind::Unresolved(d) => d.name.as_str().to_string(),
            _ => {
                // Not a type node: show the type of the expression.
                let ty = self[t].ty;
                if ty == t {
                    "<bad type>".to_string()
                } else {
                    self.type_str(ty)
                }
            }
        }
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for Ast {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}
