//! The class and interface hierarchy of the program.
//!
//! Types form a rooted DAG: every class has one superclass chain ending at `java.lang.Object`,
//! while interfaces may extend several interfaces. Types referenced by the program but not
//! declared in it are inserted as external placeholders and queued for the front end.

use indexmap::{IndexMap, IndexSet};
use jcfa_ast::{TypeDeclaration, TypeKind};
use jcfa_error::{
    error::CompileError,
    handler::Handler,
    warning::{CompileWarning, Warning},
};
use jcfa_ir::FunctionDeclaration;
use jcfa_types::{Modifiers, Span, TypeName};
use std::{collections::VecDeque, sync::Arc};

#[derive(Clone, Debug)]
pub struct TypeEntry {
    pub name: TypeName,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    /// `None` for the root and for interfaces.
    pub super_class: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    /// Direct subclasses and subinterfaces, plus the classes implementing an interface.
    pub subtypes: IndexSet<TypeName>,
    /// Declared methods by signature, e.g. `foo(int)`.
    pub methods: IndexMap<String, Arc<FunctionDeclaration>>,
    /// Not declared in the program.
    pub is_external: bool,
    pub span: Span,
}

impl TypeEntry {
    fn external(name: TypeName, kind: TypeKind) -> Self {
        let super_class = match kind {
            TypeKind::Class if !name.is_object() => Some(TypeName::object()),
            _ => None,
        };
        TypeEntry {
            name,
            kind,
            modifiers: Modifiers::public(),
            super_class,
            interfaces: vec![],
            subtypes: IndexSet::new(),
            methods: IndexMap::new(),
            is_external: true,
            span: Span::dummy(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Whether instances of exactly this type can exist.
    pub fn is_concrete_class(&self) -> bool {
        self.kind == TypeKind::Class && !self.modifiers.is_abstract
    }

    fn parents(&self) -> impl Iterator<Item = &TypeName> {
        self.super_class.iter().chain(self.interfaces.iter())
    }
}

#[derive(Debug)]
pub struct TypeHierarchy {
    types: IndexMap<TypeName, TypeEntry>,
    pending: IndexSet<TypeName>,
}

impl Default for TypeHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeHierarchy {
    pub fn new() -> Self {
        let root = TypeName::object();
        let mut types = IndexMap::new();
        types.insert(root.clone(), TypeEntry::external(root, TypeKind::Class));
        TypeHierarchy {
            types,
            pending: IndexSet::new(),
        }
    }

    pub fn get(&self, name: &TypeName) -> Option<&TypeEntry> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.types.contains_key(name)
    }

    /// Whether the type is declared in the program, as opposed to being an external placeholder.
    pub fn is_declared(&self, name: &TypeName) -> bool {
        self.types
            .get(name)
            .map(|entry| !entry.is_external)
            .unwrap_or(false)
    }

    pub fn is_final(&self, name: &TypeName) -> bool {
        self.types
            .get(name)
            .map(|entry| entry.modifiers.is_final)
            .unwrap_or(false)
    }

    pub fn is_interface(&self, name: &TypeName) -> bool {
        self.types
            .get(name)
            .map(|entry| entry.is_interface())
            .unwrap_or(false)
    }

    /// Register a declared type.
    ///
    /// Missing ancestors are inserted first as external placeholders. Registering a type twice,
    /// or a type which would become its own ancestor, fails.
    pub fn register_type(
        &mut self,
        handler: &Handler,
        decl: &TypeDeclaration,
    ) -> Result<(), CompileError> {
        let name = decl.name.clone();
        if self.is_declared(&name) || name.is_object() {
            return Err(CompileError::DuplicateType {
                name: name.to_string(),
                span: decl.span.clone(),
            });
        }

        let super_class = match decl.kind {
            TypeKind::Class => Some(decl.super_class.clone().unwrap_or_else(TypeName::object)),
            TypeKind::Interface => None,
        };
        if let Some(super_class) = &super_class {
            self.request_type_of_kind(handler, super_class, TypeKind::Class, &decl.span);
        }
        for interface in &decl.interfaces {
            self.request_type_of_kind(handler, interface, TypeKind::Interface, &decl.span);
        }

        let parents = super_class.iter().chain(decl.interfaces.iter());
        for parent in parents.clone() {
            if *parent == name || self.supertypes_of(parent).contains(&name) {
                return Err(CompileError::CyclicTypeHierarchy {
                    name: name.to_string(),
                    span: decl.span.clone(),
                });
            }
        }

        // A placeholder may have been inserted for this type while registering a subtype.
        let (subtypes, old_parents) = match self.types.get(&name) {
            Some(entry) => (
                entry.subtypes.clone(),
                entry.parents().cloned().collect::<Vec<_>>(),
            ),
            None => (IndexSet::new(), vec![]),
        };
        for parent in old_parents {
            if let Some(entry) = self.types.get_mut(&parent) {
                entry.subtypes.shift_remove(&name);
            }
        }
        for parent in parents {
            if let Some(entry) = self.types.get_mut(parent) {
                entry.subtypes.insert(name.clone());
            }
        }
        self.pending.shift_remove(&name);
        self.types.insert(
            name.clone(),
            TypeEntry {
                name,
                kind: decl.kind,
                modifiers: decl.modifiers,
                super_class,
                interfaces: decl.interfaces.clone(),
                subtypes,
                methods: IndexMap::new(),
                is_external: false,
                span: decl.span.clone(),
            },
        );
        Ok(())
    }

    pub fn register_method(&mut self, owner: &TypeName, method: Arc<FunctionDeclaration>) {
        if let Some(entry) = self.types.get_mut(owner) {
            entry
                .methods
                .insert(method.signature().to_string(), method);
        }
    }

    /// Make sure a referenced type is known, queuing it for the front end if it is not.
    ///
    /// Returns `true` if the type was newly queued.
    pub fn request_type(&mut self, handler: &Handler, name: &TypeName, span: &Span) -> bool {
        self.request_type_of_kind(handler, name, TypeKind::Class, span)
    }

    fn request_type_of_kind(
        &mut self,
        handler: &Handler,
        name: &TypeName,
        kind: TypeKind,
        span: &Span,
    ) -> bool {
        if self.types.contains_key(name) {
            return false;
        }
        self.types
            .insert(name.clone(), TypeEntry::external(name.clone(), kind));
        if kind == TypeKind::Class && !name.is_object() {
            if let Some(root) = self.types.get_mut(&TypeName::object()) {
                root.subtypes.insert(name.clone());
            }
        }
        self.pending.insert(name.clone());
        handler.emit_warn(CompileWarning {
            span: span.clone(),
            warning_content: Warning::ExternalTypeQueued {
                name: name.to_string(),
            },
        });
        true
    }

    /// Drain the queue of referenced types which are not declared in the program.
    pub fn take_pending_types(&mut self) -> Vec<TypeName> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Every transitive subtype of `name`, not including `name`, in breadth-first order.
    pub fn subtypes_of(&self, name: &TypeName) -> IndexSet<TypeName> {
        self.closure(name, |entry| entry.subtypes.iter().collect())
    }

    /// Every transitive supertype of `name`, not including `name`, in breadth-first order.
    pub fn supertypes_of(&self, name: &TypeName) -> IndexSet<TypeName> {
        self.closure(name, |entry| entry.parents().collect())
    }

    fn closure<'a>(
        &'a self,
        start: &TypeName,
        neighbours: impl Fn(&'a TypeEntry) -> Vec<&'a TypeName>,
    ) -> IndexSet<TypeName> {
        let mut seen = IndexSet::new();
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(current) = queue.pop_front() {
            let Some(entry) = self.types.get(&current) else {
                continue;
            };
            for next in neighbours(entry) {
                if next != start && seen.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }
        seen
    }

    pub fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool {
        sub == sup || self.supertypes_of(sub).contains(sup)
    }

    /// The chain of superclasses starting at `name` itself and ending at the root.
    pub fn superclass_chain(&self, name: &TypeName) -> Vec<TypeName> {
        let mut chain = vec![];
        let mut current = Some(name.clone());
        while let Some(ty) = current {
            if chain.contains(&ty) {
                break;
            }
            current = self
                .types
                .get(&ty)
                .and_then(|entry| entry.super_class.clone());
            chain.push(ty);
        }
        chain
    }

    /// `name` and all concrete classes below it, i.e. the possible run-time types of a value
    /// whose static type is `name`.
    pub fn concrete_subclasses(&self, name: &TypeName) -> Vec<TypeName> {
        std::iter::once(name.clone())
            .chain(self.subtypes_of(name))
            .filter(|ty| {
                self.types
                    .get(ty)
                    .map(|entry| entry.is_concrete_class())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// The method declared by exactly this type with the given signature.
    pub fn declared_method(
        &self,
        owner: &TypeName,
        signature: &str,
    ) -> Option<&Arc<FunctionDeclaration>> {
        self.types.get(owner)?.methods.get(signature)
    }

    /// The method run for `signature` on an instance of exactly `class`.
    ///
    /// The superclass chain is searched first, then default methods of all superinterfaces.
    pub fn find_implementation(
        &self,
        class: &TypeName,
        signature: &str,
    ) -> Option<Arc<FunctionDeclaration>> {
        let chain = self.superclass_chain(class);
        let from_classes = chain.iter().find_map(|ty| {
            self.declared_method(ty, signature)
                .filter(|method| method.has_body || method.modifiers.is_native)
        });
        if let Some(method) = from_classes {
            return Some(method.clone());
        }
        chain
            .iter()
            .flat_map(|ty| self.supertypes_of(ty))
            .filter(|ty| self.is_interface(ty))
            .find_map(|ty| {
                self.declared_method(&ty, signature)
                    .filter(|method| method.has_body)
                    .cloned()
            })
    }
}
