use crate::{
    block::{BasicBlock, Terminator},
    function::{Function, Param, ParamAttr},
    instructions::Instruction,
    program::{Global, Initializer, Program},
    types::TypeId,
    values::Value,
};
use std::fmt::{self, Display, Formatter, Write};

pub fn format_program(program: &Program) -> String {
    ProgramDisplay(program).to_string()
}

pub fn format_function(program: &Program, function: &Function) -> String {
    FunctionDisplay { program, function }.to_string()
}

pub struct ProgramDisplay<'a>(pub &'a Program);

impl Display for ProgramDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let program = self.0;
        writeln!(f, "; program {}", program.name)?;

        let structs: Vec<_> = program.types.structs().collect();
        if !structs.is_empty() {
            writeln!(f)?;
        }
        for (_, st) in structs {
            let fields: Vec<String> = st.fields.iter().map(|t| program.types.display(*t)).collect();
            writeln!(f, "%{} = type {{ {} }}", st.name, fields.join(", "))?;
        }

        if !program.globals.is_empty() {
            writeln!(f)?;
        }
        for global in program.globals.values() {
            write_global(f, program, global)?;
        }

        for function in program.functions.values() {
            writeln!(f)?;
            write!(f, "{}", FunctionDisplay { program, function })?;
        }
        Ok(())
    }
}

fn write_global(f: &mut Formatter<'_>, program: &Program, global: &Global) -> fmt::Result {
    let init = match global.initializer {
        Initializer::Zero => "zeroinitializer",
    };
    writeln!(
        f,
        "@{} = {} global {} {}",
        global.name,
        global.linkage.keyword(),
        program.types.display(global.ty),
        init
    )
}

pub struct FunctionDisplay<'a> {
    pub program: &'a Program,
    pub function: &'a Function,
}

impl FunctionDisplay<'_> {
    fn value(&self, value: &Value) -> String {
        match value {
            Value::Temp(t) => t.to_string(),
            Value::Arg(a) => match self.function.signature.params.get(a.0 as usize) {
                Some(param) => format!("%{}", param.name),
                None => a.to_string(),
            },
            Value::Constant(c) => c.to_string(),
            Value::Global(g) => match self.program.global(*g) {
                Some(global) => format!("@{}", global.name),
                None => format!("@{}", g),
            },
            Value::Function(id) => match self.program.function(*id) {
                Some(func) => format!("@{}", func.name),
                None => format!("@{}", id),
            },
            Value::Undef(_) => "undef".to_string(),
        }
    }

    fn typed(&self, value: &Value) -> String {
        let ty = self
            .function
            .value_type(value)
            .map(|t| self.program.types.display(t))
            .unwrap_or_else(|_| "?".to_string());
        format!("{} {}", ty, self.value(value))
    }

    fn param(&self, param: &Param) -> String {
        let mut out = self.program.types.display(param.ty);
        for attr in &param.attrs {
            match attr {
                ParamAttr::Dereferenceable(bytes) => {
                    let _ = write!(out, " dereferenceable({})", bytes);
                }
                ParamAttr::NoCapture => out.push_str(" nocapture"),
            }
        }
        format!("{} %{}", out, param.name)
    }

    fn instruction(&self, inst: &Instruction) -> String {
        let ty = |t: TypeId| self.program.types.display(t);
        match inst {
            Instruction::Binary {
                result,
                op,
                ty: t,
                left,
                right,
            } => format!(
                "{} = {} {} {}, {}",
                result,
                op.mnemonic(),
                ty(*t),
                self.value(left),
                self.value(right)
            ),
            Instruction::Compare {
                result,
                op,
                left,
                right,
            } => format!(
                "{} = icmp {} {}, {}",
                result,
                op.mnemonic(),
                self.typed(left),
                self.value(right)
            ),
            Instruction::Unary {
                result,
                op,
                ty: t,
                operand,
            } => format!("{} = {} {} {}", result, op.mnemonic(), ty(*t), self.value(operand)),
            Instruction::Alloca { result, ty: t } => format!("{} = alloca {}", result, ty(*t)),
            Instruction::Load {
                result,
                ty: t,
                address,
            } => format!("{} = load {}, ptr {}", result, ty(*t), self.value(address)),
            Instruction::Store { address, value } => {
                format!("store {}, ptr {}", self.typed(value), self.value(address))
            }
            Instruction::ElementAddr {
                result,
                aggregate,
                base,
                indices,
            } => {
                let indices: Vec<String> = indices.iter().map(|i| self.typed(i)).collect();
                format!(
                    "{} = elementaddr {}, ptr {}, {}",
                    result,
                    ty(*aggregate),
                    self.value(base),
                    indices.join(", ")
                )
            }
            Instruction::Call {
                result,
                callee,
                args,
            } => {
                let args: Vec<String> = args.iter().map(|a| self.typed(a)).collect();
                let callee_name = self
                    .program
                    .function(*callee)
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| callee.to_string());
                match result {
                    Some(r) => {
                        let rt = self
                            .function
                            .value_type(&Value::Temp(*r))
                            .map(ty)
                            .unwrap_or_else(|_| "?".to_string());
                        format!("{} = call {} @{}({})", r, rt, callee_name, args.join(", "))
                    }
                    None => format!("call void @{}({})", callee_name, args.join(", ")),
                }
            }
            Instruction::Phi {
                result,
                ty: t,
                incoming,
            } => {
                let incoming: Vec<String> = incoming
                    .iter()
                    .map(|(b, v)| format!("[ {}, {} ]", self.value(v), b))
                    .collect();
                format!("{} = phi {} {}", result, ty(*t), incoming.join(", "))
            }
        }
    }

    fn terminator(&self, term: &Terminator) -> String {
        match term {
            Terminator::Jump(target) => format!("br {}", target),
            Terminator::Branch {
                condition,
                then_block,
                else_block,
            } => format!("br {}, {}, {}", self.typed(condition), then_block, else_block),
            Terminator::Return(Some(value)) => format!("ret {}", self.typed(value)),
            Terminator::Return(None) => "ret void".to_string(),
            Terminator::Invalid => "<unterminated>".to_string(),
        }
    }

    fn block(&self, f: &mut Formatter<'_>, block: &BasicBlock) -> fmt::Result {
        write!(f, "{}:  ; {}", block.id, block.name)?;
        if !block.predecessors.is_empty() {
            let preds: Vec<String> = block.predecessors.iter().map(|p| p.to_string()).collect();
            write!(f, ", preds = {}", preds.join(", "))?;
        }
        writeln!(f)?;
        for inst in &block.instructions {
            writeln!(f, "  {}", self.instruction(inst))?;
        }
        writeln!(f, "  {}", self.terminator(&block.terminator))
    }
}

impl Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let function = self.function;
        let result = function
            .signature
            .result
            .map(|t| self.program.types.display(t))
            .unwrap_or_else(|| "void".to_string());
        let params: Vec<String> = function.signature.params.iter().map(|p| self.param(p)).collect();
        let keyword = if function.is_declaration() {
            "declare"
        } else {
            "define"
        };

        write!(
            f,
            "{} {} {} @{}({})",
            keyword,
            function.linkage.keyword(),
            result,
            function.name,
            params.join(", ")
        )?;
        if function.is_declaration() {
            return writeln!(f);
        }

        writeln!(f, " {{")?;
        for block in function.blocks.values() {
            self.block(f, block)?;
        }
        writeln!(f, "}}")
    }
}
