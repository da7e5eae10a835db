//! Class lowering.

use serde::Serialize;
use wrapgen_config::ClassOverride;

use crate::decl::{AccessLevel, ClassDecl};
use crate::enums::{lower_enum, ResolvedEnum};
use crate::error::Result;
use crate::filter::{
    method_exclusion, property_exclusion, resolve_property, ClassIdent, Exclusion, ResolvedProperty,
};
use crate::function::{lower_function, quote_doc, FunctionContext, ResolvedFunction};
use crate::hierarchy::{filter_bases, is_polymorphic, qualify, requires_trampoline, ResolvedBase};
use crate::lower::Lowerer;
use crate::naming::{mangle, resolve_name, trampoline_name, using_signature};
use crate::params::MemberScope;
use crate::registry::function_signature;

/// A bound member function.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedMethod {
    pub access: AccessLevel,
    #[serde(flatten)]
    pub function: ResolvedFunction,
}

/// A class ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedClass {
    pub name: String,
    pub x_name: String,
    pub namespace: String,
    /// Namespace, enclosing classes and name.
    pub qualname: String,
    pub qualname_mangled: String,
    /// Enclosing classes and name, used for override lookup.
    pub lookup_key: String,
    /// Local the class binding object is stored in.
    pub var_name: String,
    /// Exposed bases.
    pub bases: Vec<ResolvedBase>,
    pub is_polymorphic: bool,
    pub is_final: bool,
    pub has_trampoline: bool,
    pub trampoline_name: Option<String>,
    pub has_constructor: bool,
    pub methods: Vec<ResolvedMethod>,
    pub properties: Vec<ResolvedProperty>,
    pub enums: Vec<ResolvedEnum>,
    pub module_var: String,
    pub doc_quoted: Vec<String>,
}

impl ResolvedClass {
    /// Identifier for a generated `using` alias of `member`.
    pub fn using_signature(&self, member: &str) -> String {
        using_signature(&self.qualname, member)
    }
}

impl<'a> Lowerer<'a> {
    /// Lower a top-level class and every class nested in it.
    ///
    /// The result lists the class first, followed by its nested classes
    /// depth-first. Classes that are not bound are left out.
    pub fn lower_class(&mut self, class: &ClassDecl) -> Result<Vec<ResolvedClass>> {
        let mut out = Vec::new();
        self.lower_class_in(class, &[], &mut out)?;
        Ok(out)
    }

    fn lower_class_in(
        &mut self,
        class: &ClassDecl,
        enclosing: &[&str],
        out: &mut Vec<ResolvedClass>,
    ) -> Result<()> {
        let mut path = enclosing.to_vec();
        path.push(class.name.as_str());
        let key = path.join("::");
        let qualname = qualify(&class.namespace, &key);

        if !enclosing.is_empty() && class.access_in_parent == Some(AccessLevel::Private) {
            self.ignore(&qualname, Exclusion::PrivateNested);
            return Ok(());
        }

        let data = self.registry.class(&key);
        if data.ignore {
            self.ignore(&qualname, Exclusion::Ignored);
        } else {
            let resolved = self.resolve_class(class, &data, key, qualname)?;
            out.push(resolved);
        }

        for nested in &class.nested {
            self.lower_class_in(nested, &path, out)?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(class = %qualname))]
    fn resolve_class(
        &mut self,
        class: &ClassDecl,
        data: &ClassOverride,
        key: String,
        qualname: String,
    ) -> Result<ResolvedClass> {
        let module_var = self.subpackage(data.subpackage.as_deref());
        let strip_prefixes = self.strip_prefixes();

        let mut enums = Vec::new();
        for decl in class.enums.iter().filter(|e| e.access == AccessLevel::Public) {
            let enum_data = self.registry.class_enum(&key, data, decl.name.as_deref());
            if enum_data.ignore {
                let name = decl.name.as_deref().unwrap_or_default();
                self.ignore(&qualify(&qualname, name), Exclusion::Ignored);
                continue;
            }
            enums.push(lower_enum(
                decl,
                &enum_data,
                &format!("{qualname}::"),
                strip_prefixes,
            ));
        }

        let bases = filter_bases(class, data)?;
        let mut deps: Vec<String> = bases.iter().map(|b| b.qualname.clone()).collect();
        deps.extend(data.force_depends.iter().cloned());
        self.ctx.hierarchy.insert(qualname.clone(), deps)?;

        let polymorphic = is_polymorphic(class, data);
        let has_trampoline =
            requires_trampoline(polymorphic, class.is_final, data.force_no_trampoline);
        let has_constructor = class.methods.iter().any(|m| m.function.is_constructor);

        let public_members: Vec<&str> = class.public_property_names().collect();
        let scope = MemberScope {
            qualname: &qualname,
            public_members: &public_members,
        };

        let ident = ClassIdent {
            name: &class.name,
            qualname: &qualname,
            lookup_key: &key,
        };
        let mut methods = Vec::new();
        for method in &class.methods {
            let name = &method.function.name;
            if let Some(reason) = method_exclusion(method, ident) {
                self.ignore(&qualify(&qualname, name), reason);
                continue;
            }

            let signature = function_signature(&method.function);
            let method_data = self.registry.method(&key, data, name, &signature);
            if method_data.ignore {
                self.ignore(&qualify(&qualname, name), Exclusion::Ignored);
                continue;
            }

            let cx = FunctionContext {
                strip_prefixes,
                internal: method.access != AccessLevel::Public,
                scope: Some(scope),
            };
            let function = lower_function(
                &method.function,
                &method_data,
                signature,
                cx,
                &mut self.ctx.casters,
            )
            .map_err(|e| e.in_method(&key, name))?;
            methods.push(ResolvedMethod {
                access: method.access,
                function,
            });
        }

        let mut properties = Vec::new();
        for prop in &class.properties {
            if let Some(reason) = property_exclusion(prop.access, has_trampoline) {
                self.ignore(&qualify(&qualname, &prop.name), reason);
                continue;
            }
            let prop_data = self.registry.class_property(&key, data, &prop.name);
            self.ctx.casters.record(&prop.raw_type);
            if prop_data.ignore {
                self.ignore(&qualify(&qualname, &prop.name), Exclusion::Ignored);
                continue;
            }
            properties.push(resolve_property(prop, &prop_data));
        }

        let qualname_mangled = mangle(&qualname);
        let trampoline_name = has_trampoline.then(|| trampoline_name(&qualname, &class.name));
        let doc = data.doc.as_deref().or(class.doc.as_deref()).unwrap_or("");

        tracing::debug!(
            polymorphic,
            has_trampoline,
            methods = methods.len(),
            properties = properties.len(),
            "lowered class"
        );

        Ok(ResolvedClass {
            x_name: resolve_name(&class.name, data.rename.as_deref(), strip_prefixes),
            name: class.name.clone(),
            namespace: class.namespace.clone(),
            qualname_mangled,
            lookup_key: key,
            var_name: format!("cls_{}", class.name),
            bases,
            is_polymorphic: polymorphic,
            is_final: class.is_final,
            has_trampoline,
            trampoline_name,
            has_constructor,
            methods,
            properties,
            enums,
            module_var,
            doc_quoted: quote_doc(doc),
            qualname,
        })
    }
}
