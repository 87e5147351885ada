// Formula parser - converts formula strings into AST
// Supports: numbers, cell refs (A1), ranges (A1:A5), functions (SUM),
// basic math (+, -, *, /), exponentiation (^) and percent postfix (%)

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64),
    /// Cell reference, 0-based
    CellRef {
        row: usize,
        col: usize,
    },
    /// Rectangular range reference, 0-based, corners in source order
    Range {
        start_row: usize,
        start_col: usize,
        end_row: usize,
        end_col: usize,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow, // ^, right-associative
}

/// Parse a formula string (leading '=') into an AST.
pub fn parse(formula: &str) -> Result<Expr, String> {
    let formula = formula.trim();
    if !formula.starts_with('=') {
        return Err("Formula must start with =".to_string());
    }

    let tokens = tokenize(&formula[1..])?;
    if tokens.is_empty() {
        return Err("Empty formula".to_string());
    }
    let (expr, pos) = parse_add_sub(&tokens, 0)?;
    if pos != tokens.len() {
        return Err("Trailing input after expression".to_string());
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum Token {
    Number(f64),
    CellRef { row: usize, col: usize },
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    LParen,
    RParen,
    Colon,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '^' => {
                tokens.push(Token::Caret);
                chars.next();
            }
            '%' => {
                tokens.push(Token::Percent);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            ':' => {
                tokens.push(Token::Colon);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            'A'..='Z' | 'a'..='z' => {
                // Either a cell reference (B3) or a function name (SUM)
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(token) = try_parse_cell_ref(&ident) {
                    tokens.push(token);
                } else {
                    tokens.push(Token::Ident(ident.to_uppercase()));
                }
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| format!("Invalid number: {}", num_str))?;
                tokens.push(Token::Number(num));
            }
            _ => return Err(format!("Unexpected character: {}", c)),
        }
    }

    Ok(tokens)
}

/// Letters followed by digits is a cell reference; anything else is not.
fn try_parse_cell_ref(s: &str) -> Option<Token> {
    let s = s.to_uppercase();
    let mut chars = s.chars().peekable();

    let mut col_str = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_uppercase() {
            col_str.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if col_str.is_empty() {
        return None;
    }

    let row_str: String = chars.collect();
    if row_str.is_empty() || !row_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let row: usize = row_str.parse().ok()?;
    if row == 0 {
        return None;
    }

    // Overflow-checked: a long-enough column like AAAAAAAAAAAAAAA1 still
    // fits the expression bound, so it must fall through as an identifier
    // instead of wrapping
    let col = crate::cell_ref::letters_to_col(&col_str)?;

    Some(Token::CellRef { row: row - 1, col })
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_power(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_power(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

// Exponentiation (^) - right-associative, higher precedence than * /
fn parse_power(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (base, pos) = parse_percent(tokens, pos)?;

    if pos < tokens.len() {
        if let Token::Caret = &tokens[pos] {
            let (exponent, new_pos) = parse_power(tokens, pos + 1)?;
            return Ok((
                Expr::BinaryOp {
                    op: Op::Pow,
                    left: Box::new(base),
                    right: Box::new(exponent),
                },
                new_pos,
            ));
        }
    }

    Ok((base, pos))
}

// Percent postfix (%) - highest precedence operator, desugars to * 0.01
fn parse_percent(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut expr, mut pos) = parse_primary(tokens, pos)?;

    while pos < tokens.len() {
        if let Token::Percent = &tokens[pos] {
            expr = Expr::BinaryOp {
                op: Op::Mul,
                left: Box::new(expr),
                right: Box::new(Expr::Number(0.01)),
            };
            pos += 1;
        } else {
            break;
        }
    }

    Ok((expr, pos))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    if pos >= tokens.len() {
        return Err("Unexpected end of expression".to_string());
    }

    match &tokens[pos] {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::Minus => {
            // Unary minus, desugared to 0 - x
            let (inner, new_pos) = parse_primary(tokens, pos + 1)?;
            Ok((
                Expr::BinaryOp {
                    op: Op::Sub,
                    left: Box::new(Expr::Number(0.0)),
                    right: Box::new(inner),
                },
                new_pos,
            ))
        }
        Token::CellRef { row, col } => {
            // Check for a range (A1:B5)
            if pos + 2 < tokens.len() {
                if let Token::Colon = &tokens[pos + 1] {
                    if let Token::CellRef {
                        row: end_row,
                        col: end_col,
                    } = &tokens[pos + 2]
                    {
                        return Ok((
                            Expr::Range {
                                start_row: *row,
                                start_col: *col,
                                end_row: *end_row,
                                end_col: *end_col,
                            },
                            pos + 3,
                        ));
                    }
                }
            }
            Ok((
                Expr::CellRef {
                    row: *row,
                    col: *col,
                },
                pos + 1,
            ))
        }
        Token::Ident(name) => {
            if pos + 1 < tokens.len() {
                if let Token::LParen = &tokens[pos + 1] {
                    let (args, new_pos) = parse_function_args(tokens, pos + 2)?;
                    return Ok((
                        Expr::Function {
                            name: name.clone(),
                            args,
                        },
                        new_pos,
                    ));
                }
            }
            Err(format!("Unknown identifier: {}", name))
        }
        Token::LParen => {
            let (expr, new_pos) = parse_add_sub(tokens, pos + 1)?;
            if new_pos >= tokens.len() {
                return Err("Missing closing parenthesis".to_string());
            }
            match &tokens[new_pos] {
                Token::RParen => Ok((expr, new_pos + 1)),
                _ => Err("Missing closing parenthesis".to_string()),
            }
        }
        _ => Err("Unexpected token".to_string()),
    }
}

/// Parse comma-separated arguments up to the closing paren. `pos` points
/// just past the opening paren; the returned position is past the close.
fn parse_function_args(tokens: &[Token], pos: usize) -> Result<(Vec<Expr>, usize), String> {
    let mut args = Vec::new();
    let mut pos = pos;

    if let Some(Token::RParen) = tokens.get(pos) {
        return Ok((args, pos + 1));
    }

    loop {
        let (arg, new_pos) = parse_add_sub(tokens, pos)?;
        args.push(arg);
        pos = new_pos;

        match tokens.get(pos) {
            Some(Token::Comma) => pos += 1,
            Some(Token::RParen) => return Ok((args, pos + 1)),
            _ => return Err("Expected , or ) in function arguments".to_string()),
        }
    }
}
