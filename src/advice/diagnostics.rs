//! Advice diagnostic catalog
//!
//! The first argument of every descriptor is the short name of the aspect.

use crate::diagnostics::{DiagnosticDescriptor, Severity};

const fn error(id: &'static str, name: &'static str, format: &'static str) -> DiagnosticDescriptor {
    DiagnosticDescriptor {
        id,
        name,
        severity: Severity::Error,
        format,
    }
}

pub const CANNOT_APPLY_ADVICE_ON_TARGET_KIND: DiagnosticDescriptor = error(
    "LAMA0500",
    "CannotApplyAdviceOnTargetKind",
    "The aspect '{0}' cannot apply the '{1}' advice to '{2}' because it is a {3}.",
);

pub const CANNOT_INTRODUCE_MEMBER_ALREADY_EXISTS: DiagnosticDescriptor = error(
    "LAMA0501",
    "CannotIntroduceMemberAlreadyExists",
    "The aspect '{0}' cannot introduce the {1} '{2}' into '{3}' because it already exists in '{4}'.",
);

pub const CANNOT_INTRODUCE_OVERRIDE_OF_SEALED: DiagnosticDescriptor = error(
    "LAMA0502",
    "CannotIntroduceOverrideOfSealed",
    "The aspect '{0}' cannot introduce the {1} '{2}' into '{3}' because '{4}' is sealed or cannot be overridden.",
);

pub const CANNOT_INTRODUCE_WITH_DIFFERENT_STATICITY: DiagnosticDescriptor = error(
    "LAMA0503",
    "CannotIntroduceWithDifferentStaticity",
    "The aspect '{0}' cannot introduce the {1} '{2}' into '{3}' because '{4}' exists with a different staticity.",
);

pub const CANNOT_INTRODUCE_INSTANCE_MEMBER_INTO_STATIC_TYPE: DiagnosticDescriptor = error(
    "LAMA0504",
    "CannotIntroduceInstanceMemberIntoStaticType",
    "The aspect '{0}' cannot introduce the instance {1} '{2}' into '{3}' because it is a static type.",
);

pub const CANNOT_INTRODUCE_VIRTUAL_TO_TARGET_TYPE: DiagnosticDescriptor = error(
    "LAMA0505",
    "CannotIntroduceVirtualToTargetType",
    "The aspect '{0}' cannot introduce the virtual {1} '{2}' into '{3}' because it is sealed, static or a struct.",
);

pub const CANNOT_INTRODUCE_STATIC_VIRTUAL_MEMBER: DiagnosticDescriptor = error(
    "LAMA0506",
    "CannotIntroduceStaticVirtualMember",
    "The aspect '{0}' cannot introduce the {1} '{2}' into '{3}' because it is both static and virtual.",
);

pub const CANNOT_INTRODUCE_STATIC_SEALED_MEMBER: DiagnosticDescriptor = error(
    "LAMA0507",
    "CannotIntroduceStaticSealedMember",
    "The aspect '{0}' cannot introduce the {1} '{2}' into '{3}' because it is both static and sealed.",
);

pub const CANNOT_INTRODUCE_WITH_DIFFERENT_KIND: DiagnosticDescriptor = error(
    "LAMA0508",
    "CannotIntroduceWithDifferentKind",
    "The aspect '{0}' cannot introduce the {1} '{2}' into '{3}' because '{4}' is a {5}.",
);

pub const CANNOT_INTRODUCE_DIFFERENT_EXISTING_RETURN_TYPE: DiagnosticDescriptor = error(
    "LAMA0509",
    "CannotIntroduceDifferentExistingReturnType",
    "The aspect '{0}' cannot introduce the {1} '{2}' into '{3}' because '{4}' has type '{5}' instead of '{6}'.",
);

pub const CANNOT_INTRODUCE_NEW_MEMBER_WHEN_IT_ALREADY_EXISTS: DiagnosticDescriptor = error(
    "LAMA0510",
    "CannotIntroduceNewMemberWhenItAlreadyExists",
    "The aspect '{0}' cannot introduce the new {1} '{2}' into '{3}' because '{4}' is already declared in that type.",
);

pub const INTERFACE_IS_ALREADY_IMPLEMENTED: DiagnosticDescriptor = error(
    "LAMA0511",
    "InterfaceIsAlreadyImplemented",
    "The aspect '{0}' cannot implement '{1}' in '{2}' because the type already implements it.",
);

pub const MISSING_DECLARATIVE_INTERFACE_MEMBER: DiagnosticDescriptor = error(
    "LAMA0512",
    "MissingDeclarativeInterfaceMember",
    "The aspect '{0}' cannot implement '{1}' because it has no interface member template for '{2}'.",
);

pub const DECLARATIVE_INTERFACE_MEMBER_DOES_NOT_MATCH: DiagnosticDescriptor = error(
    "LAMA0513",
    "DeclarativeInterfaceMemberDoesNotMatch",
    "The aspect '{0}' cannot implement '{1}' because the template '{2}' does not match the signature of '{3}'.",
);

pub const IMPLICIT_INTERFACE_IMPLEMENTATION_HAS_TO_BE_PUBLIC: DiagnosticDescriptor = error(
    "LAMA0514",
    "ImplicitInterfaceImplementationHasToBePublic",
    "The aspect '{0}' cannot implement '{1}' implicitly because the template '{2}' is not public.",
);

pub const IMPLICIT_INTERFACE_MEMBER_ALREADY_EXISTS: DiagnosticDescriptor = error(
    "LAMA0515",
    "ImplicitInterfaceMemberAlreadyExists",
    "The aspect '{0}' cannot implicitly implement '{1}' in '{2}' because '{3}' already exists.",
);

pub const INTERFACE_PROPERTY_IS_MISSING_ACCESSOR: DiagnosticDescriptor = error(
    "LAMA0516",
    "InterfacePropertyIsMissingAccessor",
    "The aspect '{0}' cannot implement '{1}' because the template '{2}' has no '{3}' accessor.",
);

pub const EXPLICIT_INTERFACE_PROPERTY_HAS_SUPERFICIAL_ACCESSOR: DiagnosticDescriptor = error(
    "LAMA0517",
    "ExplicitInterfacePropertyHasSuperficialAccessor",
    "The aspect '{0}' cannot explicitly implement '{1}' because the template '{2}' has a '{3}' accessor the interface does not declare.",
);

pub const CANNOT_INTRODUCE_INDEXER_WITHOUT_PARAMETERS: DiagnosticDescriptor = error(
    "LAMA0518",
    "CannotIntroduceIndexerWithoutParameters",
    "The aspect '{0}' cannot introduce an indexer into '{1}' because it has no parameters.",
);

pub const CANNOT_INTRODUCE_STATIC_INDEXER: DiagnosticDescriptor = error(
    "LAMA0519",
    "CannotIntroduceStaticIndexer",
    "The aspect '{0}' cannot introduce an indexer into '{1}' because indexers cannot be static.",
);

pub const CANNOT_INTRODUCE_PARAMETER_INTO_STATIC_CONSTRUCTOR: DiagnosticDescriptor = error(
    "LAMA0520",
    "CannotIntroduceParameterIntoStaticConstructor",
    "The aspect '{0}' cannot introduce the parameter '{1}' into '{2}' because it is a static constructor.",
);

pub const CANNOT_INTRODUCE_PARAMETER_ALREADY_EXISTS: DiagnosticDescriptor = error(
    "LAMA0521",
    "CannotIntroduceParameterAlreadyExists",
    "The aspect '{0}' cannot introduce the parameter '{1}' into '{2}' because a parameter with that name already exists.",
);

pub const CANNOT_INTRODUCE_FINALIZER_INTO_NON_CLASS: DiagnosticDescriptor = error(
    "LAMA0522",
    "CannotIntroduceFinalizerIntoNonClass",
    "The aspect '{0}' cannot introduce a finalizer into '{1}' because it is not a class.",
);

pub const CANNOT_INTRODUCE_ATTRIBUTE_ALREADY_EXISTS: DiagnosticDescriptor = error(
    "LAMA0523",
    "CannotIntroduceAttributeAlreadyExists",
    "The aspect '{0}' cannot add the attribute '{1}' to '{2}' because it is already present.",
);

pub const CANNOT_ADD_INITIALIZER_TO_STATIC_TYPE: DiagnosticDescriptor = error(
    "LAMA0524",
    "CannotAddInitializerToStaticType",
    "The aspect '{0}' cannot add an instance initializer to '{1}' because it is a static type.",
);

pub const CANNOT_INTRODUCE_INTO_INTERFACE: DiagnosticDescriptor = error(
    "LAMA0525",
    "CannotIntroduceIntoInterface",
    "The aspect '{0}' cannot introduce the {1} '{2}' into '{3}' because it is an interface.",
);

pub const CANNOT_OVERRIDE_ABSTRACT_MEMBER: DiagnosticDescriptor = error(
    "LAMA0526",
    "CannotOverrideAbstractMember",
    "The aspect '{0}' cannot override '{1}' because it is abstract.",
);

pub const CANNOT_ADD_CONTRACT_TO_DIRECTION: DiagnosticDescriptor = error(
    "LAMA0527",
    "CannotAddContractToDirection",
    "The aspect '{0}' cannot add a contract with direction '{1}' to '{2}'.",
);

/// Every descriptor, in id order
pub const ALL: [DiagnosticDescriptor; 28] = [
    CANNOT_APPLY_ADVICE_ON_TARGET_KIND,
    CANNOT_INTRODUCE_MEMBER_ALREADY_EXISTS,
    CANNOT_INTRODUCE_OVERRIDE_OF_SEALED,
    CANNOT_INTRODUCE_WITH_DIFFERENT_STATICITY,
    CANNOT_INTRODUCE_INSTANCE_MEMBER_INTO_STATIC_TYPE,
    CANNOT_INTRODUCE_VIRTUAL_TO_TARGET_TYPE,
    CANNOT_INTRODUCE_STATIC_VIRTUAL_MEMBER,
    CANNOT_INTRODUCE_STATIC_SEALED_MEMBER,
    CANNOT_INTRODUCE_WITH_DIFFERENT_KIND,
    CANNOT_INTRODUCE_DIFFERENT_EXISTING_RETURN_TYPE,
    CANNOT_INTRODUCE_NEW_MEMBER_WHEN_IT_ALREADY_EXISTS,
    INTERFACE_IS_ALREADY_IMPLEMENTED,
    MISSING_DECLARATIVE_INTERFACE_MEMBER,
    DECLARATIVE_INTERFACE_MEMBER_DOES_NOT_MATCH,
    IMPLICIT_INTERFACE_IMPLEMENTATION_HAS_TO_BE_PUBLIC,
    IMPLICIT_INTERFACE_MEMBER_ALREADY_EXISTS,
    INTERFACE_PROPERTY_IS_MISSING_ACCESSOR,
    EXPLICIT_INTERFACE_PROPERTY_HAS_SUPERFICIAL_ACCESSOR,
    CANNOT_INTRODUCE_INDEXER_WITHOUT_PARAMETERS,
    CANNOT_INTRODUCE_STATIC_INDEXER,
    CANNOT_INTRODUCE_PARAMETER_INTO_STATIC_CONSTRUCTOR,
    CANNOT_INTRODUCE_PARAMETER_ALREADY_EXISTS,
    CANNOT_INTRODUCE_FINALIZER_INTO_NON_CLASS,
    CANNOT_INTRODUCE_ATTRIBUTE_ALREADY_EXISTS,
    CANNOT_ADD_INITIALIZER_TO_STATIC_TYPE,
    CANNOT_INTRODUCE_INTO_INTERFACE,
    CANNOT_OVERRIDE_ABSTRACT_MEMBER,
    CANNOT_ADD_CONTRACT_TO_DIRECTION,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_are_sequential() {
        for (i, d) in ALL.iter().enumerate() {
            assert_eq!(d.id, format!("LAMA05{:02}", i));
            assert_eq!(d.severity, Severity::Error);
        }
    }

    #[test]
    fn test_create_formats_positional_arguments() {
        let d = CANNOT_INTRODUCE_STATIC_INDEXER.create(&["Cache", "App.Store"]);
        assert_eq!(d.id, "LAMA0519");
        assert_eq!(d.aspect.as_deref(), Some("Cache"));
        assert_eq!(
            d.message,
            "The aspect 'Cache' cannot introduce an indexer into 'App.Store' because indexers cannot be static."
        );
    }
}
