use cfgrammar::yacc::YaccKind;
use lrlex::{ct_token_map, DefaultLexerTypes};
use lrpar::{CTParserBuilder, RecoveryKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ctp = CTParserBuilder::<DefaultLexerTypes<u8>>::new()
        .yacckind(YaccKind::Grmtools)
        .recoverer(RecoveryKind::None)
        .grammar_in_src_dir("parser/query.y")?
        .build()?;
    ct_token_map::<u8>("token_map", ctp.token_map(), None)
}
