#![forbid(unsafe_code)]

/// Generated sources use CRLF, matching what the firmware toolchains expect.
pub const EOL: &str = "\r\n";

const RULE: &str = "*****************************************************************************";

/// Section setup shared by every ASM30 rendering; the data label follows it.
pub const ASM30_PREAMBLE: &[&str] = &[
    ".equ VALID_ID,0",
    ".include \"xc.inc\"",
    ".if VALID_ID <> 1",
    "    .error \"Processor ID not specified in generic include files.  New ASM30 assembler needs to be downloaded?\"",
    ".endif",
    "\t.text",
    "\t.section\tMPFSData,code",
    "",
    "\tgoto END_OF_MPFS\t; Prevent accidental execution of constant data.",
    "\t.global BEGIN_MPFS",
];

/// Local time in the banner's `Generated ...` line.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%a %b %d %Y %H:%M:%S").to_string()
}

fn banner_lines(file_name: &str, timestamp: &str, description: &[&str]) -> Vec<String> {
    let mut lines = vec![
        format!("AUTO-GENERATED CODE:  mpfsgen {}", env!("CARGO_PKG_VERSION")),
        String::new(),
        "File Name:".to_string(),
        format!("  {file_name}"),
        String::new(),
        "Summary:".to_string(),
        "  NOT FOR HAND MODIFICATION.".to_string(),
        "  This file is automatically generated by the MPFS image generator.".to_string(),
        "  ALL MODIFICATIONS WILL BE OVERWRITTEN BY THE GENERATOR.".to_string(),
        format!("  Generated {timestamp}"),
        String::new(),
        "Description:".to_string(),
    ];
    lines.extend(description.iter().map(|d| format!("  {d}")));
    lines
}

/// Block comment heading a generated C file.
pub fn c_banner(file_name: &str, timestamp: &str, description: &[&str]) -> String {
    let mut out = format!("/{RULE}{EOL}");
    for line in banner_lines(file_name, timestamp, description) {
        if line.is_empty() {
            out.push_str(EOL);
        } else {
            out.push_str(&format!("  {line}{EOL}"));
        }
    }
    out.push_str(&format!(" {RULE}/{EOL}{EOL}"));
    out
}

/// `;` comment block heading a generated assembly file.
pub fn asm_banner(file_name: &str, timestamp: &str, description: &[&str]) -> String {
    let mut out = format!(";{RULE}{EOL}");
    for line in banner_lines(file_name, timestamp, description) {
        if line.is_empty() {
            out.push_str(&format!(";{EOL}"));
        } else {
            out.push_str(&format!(";  {line}{EOL}"));
        }
    }
    out.push_str(&format!(";{RULE}{EOL}{EOL}"));
    out
}
