// Modifier bits, laid out like the class-file access flags

pub const ACC_PUBLIC: u32 = 0x0001;
pub const ACC_PRIVATE: u32 = 0x0002;
pub const ACC_PROTECTED: u32 = 0x0004;
pub const ACC_STATIC: u32 = 0x0008;
pub const ACC_FINAL: u32 = 0x0010;
pub const ACC_SYNCHRONIZED: u32 = 0x0020;
pub const ACC_VOLATILE: u32 = 0x0040;
pub const ACC_TRANSIENT: u32 = 0x0080;
pub const ACC_NATIVE: u32 = 0x0100;
pub const ACC_INTERFACE: u32 = 0x0200;
pub const ACC_ABSTRACT: u32 = 0x0400;
pub const ACC_STRICTFP: u32 = 0x0800;
pub const ACC_SYNTHETIC: u32 = 0x1000;
pub const ACC_ANNOTATION: u32 = 0x2000;
pub const ACC_ENUM: u32 = 0x4000;

// Source-only bits live above the class-file range
pub const ACC_DEFAULT_METHOD: u32 = 0x0001_0000;
pub const ACC_DEPRECATED: u32 = 0x0010_0000;
pub const ACC_PRIVILEGED: u32 = 0x0020_0000;

// Bits that survive into a class file; everything above is bookkeeping
pub const ACC_JUST_FLAG: u32 = 0xFFFF;

// Bits that take part in structural binding equality
pub const ACC_EQUALITY_MASK: u32 = ACC_JUST_FLAG | ACC_INTERFACE | ACC_ENUM | ACC_ANNOTATION;

// Parser: upper bound on automaton steps per unit
pub const PARSER_MAX_GAS: usize = 5_000_000;

// Trial repairs: how many completions are explored at end of input
pub const RECOVERY_MAX_COMPLETION_STATES: usize = 4_096;

// Placeholder selector carried by advice declarations
pub const ADVICE_SELECTOR: &str = "ajc$advice";

// Exceptions treated as unchecked by the flow analysis
pub const UNCHECKED_BASE_EXCEPTIONS: &[&str] = &[
    "RuntimeException",
    "Error",
    "AssertionError",
];

// Common RuntimeException subclasses, also unchecked
pub const UNCHECKED_COMMON_SUBCLASSES: &[&str] = &[
    "ArithmeticException",
    "NullPointerException",
    "ClassCastException",
    "ArrayIndexOutOfBoundsException",
    "IndexOutOfBoundsException",
    "IllegalArgumentException",
    "IllegalStateException",
    "UnsupportedOperationException",
    "NoSuchElementException",
    "NumberFormatException",
    "SoftException",
];

/// Render a modifier set the way it appears in source.
pub fn modifiers_to_string(modifiers: u32) -> String {
    const NAMES: &[(u32, &str)] = &[
        (ACC_PUBLIC, "public"),
        (ACC_PROTECTED, "protected"),
        (ACC_PRIVATE, "private"),
        (ACC_ABSTRACT, "abstract"),
        (ACC_DEFAULT_METHOD, "default"),
        (ACC_STATIC, "static"),
        (ACC_FINAL, "final"),
        (ACC_TRANSIENT, "transient"),
        (ACC_VOLATILE, "volatile"),
        (ACC_SYNCHRONIZED, "synchronized"),
        (ACC_NATIVE, "native"),
        (ACC_STRICTFP, "strictfp"),
    ];
    NAMES
        .iter()
        .filter(|(bit, _)| modifiers & bit != 0)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(" ")
}
