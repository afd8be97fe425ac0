//! In-memory source-type universes for exercising the unification engine.
//!
//! Provides minimal, representative type declarations without any real
//! reflection behind them: tests declare types through the builder methods
//! and hand the [`Universe`] to the engine as its `Reflector`.

use conflux_core::{
    EnumConstant, MergePolicyError, RawProperty, Reflector, SourceTypeId, TypeMerger, ValueShape,
};

#[derive(Debug, Clone)]
enum TypeKind {
    /// Reserved but not yet shaped; reflected as a plain scalar leaf.
    Declared,
    Primitive,
    Scalar,
    Enumeration {
        constants: Vec<EnumConstant>,
    },
    Branch {
        properties: Vec<RawProperty>,
        superclass: Option<SourceTypeId>,
        subclasses: Vec<SourceTypeId>,
    },
}

#[derive(Debug, Clone)]
struct TypeDecl {
    name: String,
    kind: TypeKind,
}

/// A registry of declared types acting as the engine's type universe.
#[derive(Debug, Default)]
pub struct Universe {
    types: Vec<TypeDecl>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, name: &str, kind: TypeKind) -> SourceTypeId {
        let id = SourceTypeId::new(self.types.len() as u32);
        self.types.push(TypeDecl {
            name: name.to_string(),
            kind,
        });
        id
    }

    fn decl(&self, ty: SourceTypeId) -> &TypeDecl {
        &self.types[ty.index()]
    }

    /// Reserve a handle to be shaped later; lets cyclic shapes refer to
    /// themselves before their definition is complete.
    pub fn declare(&mut self, name: &str) -> SourceTypeId {
        self.add(name, TypeKind::Declared)
    }

    /// A leaf type whose values can never be absent.
    pub fn primitive(&mut self, name: &str) -> SourceTypeId {
        self.add(name, TypeKind::Primitive)
    }

    /// A non-primitive leaf type (a reference-like scalar).
    pub fn scalar(&mut self, name: &str) -> SourceTypeId {
        self.add(name, TypeKind::Scalar)
    }

    /// An enumeration whose constants display under their own identifiers.
    pub fn enumeration(&mut self, name: &str, constants: &[&str]) -> SourceTypeId {
        let constants = constants
            .iter()
            .map(|constant| EnumConstant {
                constant: constant.to_string(),
                display_name: constant.to_string(),
            })
            .collect();
        self.add(name, TypeKind::Enumeration { constants })
    }

    /// An enumeration with explicit `(constant, display name)` pairs.
    pub fn enumeration_with_names(
        &mut self,
        name: &str,
        constants: &[(&str, &str)],
    ) -> SourceTypeId {
        let constants = constants
            .iter()
            .map(|(constant, display)| EnumConstant {
                constant: constant.to_string(),
                display_name: display.to_string(),
            })
            .collect();
        self.add(name, TypeKind::Enumeration { constants })
    }

    /// Declare an empty branch type; shape it with [`Universe::define`].
    pub fn branch(&mut self, name: &str) -> SourceTypeId {
        self.add(
            name,
            TypeKind::Branch {
                properties: Vec::new(),
                superclass: None,
                subclasses: Vec::new(),
            },
        )
    }

    /// Shape a handle as a branch type, promoting a bare declaration.
    pub fn define(&mut self, ty: SourceTypeId) -> BranchDef<'_> {
        let decl = &mut self.types[ty.index()];
        if !matches!(decl.kind, TypeKind::Branch { .. }) {
            decl.kind = TypeKind::Branch {
                properties: Vec::new(),
                superclass: None,
                subclasses: Vec::new(),
            };
        }
        BranchDef { universe: self, ty }
    }
}

/// Builder over one branch declaration.
pub struct BranchDef<'a> {
    universe: &'a mut Universe,
    ty: SourceTypeId,
}

impl BranchDef<'_> {
    fn push(mut self, property: RawProperty) -> Self {
        if let TypeKind::Branch { properties, .. } =
            &mut self.universe.types[self.ty.index()].kind
        {
            properties.push(property);
        }
        self
    }

    /// A mandatory single-valued property.
    pub fn property(self, name: &str, value: SourceTypeId) -> Self {
        self.push(RawProperty::new(name, ValueShape::Plain(value), true))
    }

    /// A not-required property; optional unless the value type is primitive.
    pub fn optional(self, name: &str, value: SourceTypeId) -> Self {
        self.push(RawProperty::new(name, ValueShape::Plain(value), false))
    }

    /// A sequence-shaped property.
    pub fn list(self, name: &str, element: SourceTypeId) -> Self {
        self.push(RawProperty::new(name, ValueShape::Sequence(element), true))
    }

    /// A property with a parametric shape the engine must reject.
    pub fn unsupported(self, name: &str, rendered: &str) -> Self {
        self.push(RawProperty::new(
            name,
            ValueShape::Unsupported {
                rendered: rendered.to_string(),
            },
            true,
        ))
    }

    /// Link this branch under `superclass`, registering the subtype edge on
    /// the parent as well. The parent must already be a branch.
    pub fn extends(mut self, superclass: SourceTypeId) -> Self {
        let ty = self.ty;
        if let TypeKind::Branch {
            superclass: sup, ..
        } = &mut self.universe.types[ty.index()].kind
        {
            *sup = Some(superclass);
        }
        if let TypeKind::Branch { subclasses, .. } =
            &mut self.universe.types[superclass.index()].kind
        {
            subclasses.push(ty);
        }
        self
    }

    pub fn id(&self) -> SourceTypeId {
        self.ty
    }
}

impl Reflector for Universe {
    fn type_name(&self, ty: SourceTypeId) -> String {
        self.decl(ty).name.clone()
    }

    fn is_branch(&self, ty: SourceTypeId) -> bool {
        matches!(self.decl(ty).kind, TypeKind::Branch { .. })
    }

    fn is_enumeration(&self, ty: SourceTypeId) -> bool {
        matches!(self.decl(ty).kind, TypeKind::Enumeration { .. })
    }

    fn is_primitive(&self, ty: SourceTypeId) -> bool {
        matches!(self.decl(ty).kind, TypeKind::Primitive)
    }

    fn properties(&self, ty: SourceTypeId) -> Vec<RawProperty> {
        match &self.decl(ty).kind {
            TypeKind::Branch { properties, .. } => properties.clone(),
            _ => Vec::new(),
        }
    }

    fn superclass(&self, ty: SourceTypeId) -> Option<SourceTypeId> {
        match &self.decl(ty).kind {
            TypeKind::Branch { superclass, .. } => *superclass,
            _ => None,
        }
    }

    fn subclasses(&self, ty: SourceTypeId) -> Vec<SourceTypeId> {
        match &self.decl(ty).kind {
            TypeKind::Branch { subclasses, .. } => subclasses.clone(),
            _ => Vec::new(),
        }
    }

    fn enumeration_constants(&self, ty: SourceTypeId) -> Vec<EnumConstant> {
        match &self.decl(ty).kind {
            TypeKind::Enumeration { constants } => constants.clone(),
            _ => Vec::new(),
        }
    }
}

/// Merges leaf types by display name: contributors sharing a name collapse to
/// the first-seen handle; disagreeing names are rejected.
pub struct NameMerger<'u> {
    universe: &'u Universe,
}

impl<'u> NameMerger<'u> {
    pub fn new(universe: &'u Universe) -> Self {
        Self { universe }
    }
}

impl TypeMerger for NameMerger<'_> {
    fn merge(&self, types: &[SourceTypeId]) -> Result<SourceTypeId, MergePolicyError> {
        let Some((&first, rest)) = types.split_first() else {
            return Err(MergePolicyError::new("no leaf types to merge"));
        };
        let name = self.universe.type_name(first);
        for &other in rest {
            let other_name = self.universe.type_name(other);
            if other_name != name {
                return Err(MergePolicyError::new(format!(
                    "cannot merge leaf types `{name}` and `{other_name}`"
                )));
            }
        }
        Ok(first)
    }
}

/// Always yields the first contributor's type.
pub struct FirstWins;

impl TypeMerger for FirstWins {
    fn merge(&self, types: &[SourceTypeId]) -> Result<SourceTypeId, MergePolicyError> {
        types
            .first()
            .copied()
            .ok_or_else(|| MergePolicyError::new("no leaf types to merge"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universe_reflects_declared_shapes() {
        let mut universe = Universe::new();
        let string = universe.scalar("String");
        let color = universe.enumeration("Color", &["RED", "GREEN"]);
        let node = universe.declare("Node");
        universe
            .define(node)
            .property("name", string)
            .optional("next", node);

        assert!(universe.is_branch(node));
        assert!(!universe.is_branch(string));
        assert!(universe.is_enumeration(color));
        assert_eq!(universe.properties(node).len(), 2);
        assert_eq!(universe.enumeration_constants(color).len(), 2);
        assert_eq!(universe.type_name(node), "Node");
    }

    #[test]
    fn extends_registers_both_directions() {
        let mut universe = Universe::new();
        let base = universe.branch("Base");
        let derived = universe.branch("Derived");
        universe.define(derived).extends(base);

        assert_eq!(universe.superclass(derived), Some(base));
        assert_eq!(universe.subclasses(base), vec![derived]);
    }
}
