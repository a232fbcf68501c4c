//! Built-in request scripts for trying the backend without a front end

use crate::script::{Request, Script};

pub const NAMES: [&str; 3] = ["arith", "loop", "branch"];

pub fn by_name(name: &str) -> Option<Script> {
    match name {
        "arith" => Some(arith()),
        "loop" => Some(countdown()),
        "branch" => Some(branch()),
        _ => None,
    }
}

fn s(text: &str) -> String {
    text.to_string()
}

/// `write((1 + 2) * 3);`
pub fn arith() -> Script {
    Script {
        strings: vec![],
        requests: vec![
            Request::Alloc { name: s("a") },
            Request::Li { dst: s("a"), value: 1 },
            Request::Alloc { name: s("b") },
            Request::Li { dst: s("b"), value: 2 },
            Request::Alloc { name: s("r") },
            Request::Binop { operator: s("add"), dst: s("r"), lhs: s("a"), rhs: s("b") },
            Request::Free { name: s("a") },
            Request::Free { name: s("b") },
            Request::BinopImm { operator: s("mul"), dst: s("r"), src: s("r"), value: 3 },
            Request::WriteReg { reg: s("r") },
            Request::Free { name: s("r") },
            Request::WriteNewline,
        ],
    }
}

/// `read(i); while (i > 0) { write(i); i = i - 1; }`
pub fn countdown() -> Script {
    Script {
        strings: vec![],
        requests: vec![
            Request::Alloc { name: s("i") },
            Request::ReadInt { dst: s("i") },
            Request::BeginWhile,
            Request::Alloc { name: s("c") },
            Request::Binop { operator: s("sgt"), dst: s("c"), lhs: s("i"), rhs: s("$zero") },
            Request::LoopTest { cond: s("c") },
            Request::Free { name: s("c") },
            Request::WriteReg { reg: s("i") },
            Request::WriteNewline,
            Request::BinopImm { operator: s("sub"), dst: s("i"), src: s("i"), value: 1 },
            Request::EndWhile,
            Request::Free { name: s("i") },
        ],
    }
}

/// `read(x); if (x == 0) write("zero"); else write("nonzero");`
pub fn branch() -> Script {
    Script {
        strings: vec![s("zero"), s("nonzero")],
        requests: vec![
            Request::Alloc { name: s("x") },
            Request::ReadInt { dst: s("x") },
            Request::Alloc { name: s("c") },
            Request::BinopImm { operator: s("seq"), dst: s("c"), src: s("x"), value: 0 },
            Request::BeginIf { cond: s("c") },
            Request::Free { name: s("c") },
            Request::Alloc { name: s("p") },
            Request::La { dst: s("p"), symbol: s("__str0") },
            Request::WriteString { reg: s("p") },
            Request::BeginElse,
            Request::La { dst: s("p"), symbol: s("__str1") },
            Request::WriteString { reg: s("p") },
            Request::EndIf,
            Request::Free { name: s("p") },
            Request::Free { name: s("x") },
            Request::WriteNewline,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Runner;
    use cmc_codegen::CodegenContext;

    #[test]
    fn test_every_demo_runs() {
        for name in NAMES {
            let script = by_name(name).unwrap();
            let (out, stats) = Runner::new(CodegenContext::new(Vec::new())).run(&script).unwrap();
            let out = String::from_utf8(out).unwrap();
            assert!(out.starts_with(".data\n"), "{name}");
            assert!(out.contains("\tli $v0, 10\n\tsyscall\n"), "{name}");
            assert_eq!(stats.requests, script.requests.len());
        }
    }

    #[test]
    fn test_branch_layout() {
        let (out, _) = Runner::new(CodegenContext::new(Vec::new())).run(&branch()).unwrap();
        let out = String::from_utf8(out).unwrap();

        let body = concat!(
            "\tseq $t1, $t0, 0\n",
            "\tbeq $t1, $zero, .L0\n",
            "\tla $t1, __str0\n",
            "\tmove $a0, $t1\n\tli $v0, 4\n\tsyscall\n",
            "\tj .L1\n",
            ".L0:\n",
            "\tla $t1, __str1\n",
            "\tmove $a0, $t1\n\tli $v0, 4\n\tsyscall\n",
            ".L1:\n",
        );
        assert!(out.contains(body), "{out}");
        assert!(out.ends_with(".data\n__str0: .asciiz \"zero\"\n__str1: .asciiz \"nonzero\"\n"));
    }

    #[test]
    fn test_unknown_demo() {
        assert!(by_name("fib").is_none());
    }
}
