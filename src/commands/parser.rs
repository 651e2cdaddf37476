//! Parseur de commande
//!
//! Les commandes sont des messages préfixés : `!nom arg1 "arg 2" texte libre`.
//! - Chaque argument est séparé par des espaces, sauf les arguments quotés.
//! - Le dernier argument peut être déclaré comme texte libre : il reçoit tout
//!   le reste du message, espaces compris.
//!
//! Le parseur ne fait que découper la commande, il ne l'exécute pas.
//!
//! # Exemple
//!
//! ```rust
//! let reply = cmd::Command::new("reply")
//!     .set_help("Répondre sur un de vos tickets")
//!     .add_argument(cmd::Argument::new("ticket").set_required(true))
//!     .add_argument(cmd::Argument::new("message").set_rest(true));
//! ```
//! **Utilisation**: `!reply 00001 Toujours pas de réseau`

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::IDType;

lazy_static! {
    static ref RE_TOKEN: Regex = Regex::new(r#"^\s*(?:"([^"]*)"|(\S+))"#).unwrap();
    static ref RE_MENTION: Regex = Regex::new(r"^(?:<@!?(\d+)>|(\d+))$").unwrap();
}

/// Structures de retour d'une commande qui a match avec le parseur
pub mod matching {
    #[derive(Debug, PartialEq, Eq)]
    pub struct Argument<'a> {
        pub name: &'a str,
        pub value: &'a str,
    }
    #[derive(Debug, PartialEq, Eq)]
    pub struct Command<'a> {
        pub name: &'a str,
        pub args: Vec<Argument<'a>>,
    }
    impl<'a> Command<'a> {
        pub fn get(&self, name: &str) -> Option<&'a str> {
            self.args.iter().find(|a| a.name == name).map(|a| a.value)
        }
    }
}

/// Erreur de parsing
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    /// La commande n'a pas matché
    NotMatched,
    /// Argument requis manquant
    MissingArgument(&'a str),
    /// Argument en trop
    UnexpectedArgument(&'a str),
}

impl<'a> ToString for ParseError<'a> {
    fn to_string(&self) -> String {
        match &self {
            ParseError::NotMatched => "Commande inconnue".to_string(),
            ParseError::MissingArgument(v) => format!("Argument {} requis", v),
            ParseError::UnexpectedArgument(v) => format!("Argument {} inattendu", v),
        }
    }
}

/// Qui peut lancer la commande
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    User,
    Admin,
    Senior,
}

/// Découpe le premier mot, quoté ou non. Retourne le mot et le reste.
pub fn next_token(txt: &str) -> Option<(&str, &str)> {
    let caps = RE_TOKEN.captures(txt)?;
    let end = caps.get(0)?.end();
    let token = caps.get(1).or_else(|| caps.get(2))?.as_str();
    Some((token, &txt[end..]))
}

/// Convertit une chaine de caractère en groupe d'arguments
#[cfg(test)]
fn split_shell(mut txt: &str) -> Vec<&str> {
    let mut args = Vec::new();
    while let Some((token, rest)) = next_token(txt) {
        args.push(token);
        txt = rest;
    }
    args
}

/// Lit une mention Discord (`<@123>`) ou un identifiant brut.
pub fn parse_mention(txt: &str) -> Option<IDType> {
    let caps = RE_MENTION.captures(txt.trim())?;
    caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()
}

///Argument de commande
#[derive(Debug, Clone)]
pub struct Argument {
    pub name: String,
    pub help: Option<String>,
    pub required: bool,
    /// Reçoit tout le reste du message
    pub rest: bool,
}

impl Argument {
    pub fn new<S: Into<String>>(name: S) -> Argument {
        Argument {
            name: name.into(),
            help: None,
            required: false,
            rest: false,
        }
    }
    pub fn set_help<S: Into<String>>(mut self, h: S) -> Argument {
        self.help = Some(h.into());
        self
    }
    pub fn set_required(mut self, req: bool) -> Argument {
        self.required = req;
        self
    }
    pub fn set_rest(mut self, rest: bool) -> Argument {
        self.rest = rest;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub help: Option<String>,
    pub scope: Scope,
    pub args: Vec<Argument>,
}

impl Command {
    pub fn new<S: Into<String>>(name: S) -> Command {
        Command {
            name: name.into(),
            help: None,
            scope: Scope::User,
            args: Vec::new(),
        }
    }
    pub fn set_help<S: Into<String>>(mut self, h: S) -> Command {
        self.help = Some(h.into());
        self
    }
    pub fn set_scope(mut self, scope: Scope) -> Command {
        self.scope = scope;
        self
    }
    pub fn add_argument(mut self, arg: Argument) -> Command {
        self.args.push(arg);
        self
    }
    /// Ligne d'aide : `nom <requis> [optionnel] : description`
    pub fn usage(&self, prefix: char) -> String {
        let mut msg = format!("`{}{}", prefix, self.name);
        for arg in &self.args {
            match arg.required {
                true => msg.push_str(&format!(" <{}>", arg.name)),
                false => msg.push_str(&format!(" [{}]", arg.name)),
            }
        }
        msg.push('`');
        if let Some(help) = &self.help {
            msg.push_str(&format!(" : {}", help));
        }
        msg
    }

    /// `line` est le message sans le préfixe.
    pub fn try_match<'a>(&'a self, line: &'a str) -> Result<matching::Command<'a>, ParseError<'a>> {
        let (name, mut rest) = next_token(line).ok_or(ParseError::NotMatched)?;
        if !name.eq_ignore_ascii_case(&self.name) {
            return Err(ParseError::NotMatched);
        }
        let mut args = Vec::new();
        for arg in &self.args {
            let value = if arg.rest {
                let value = rest.trim();
                rest = "";
                Some(value).filter(|v| !v.is_empty())
            } else {
                next_token(rest).map(|(token, next)| {
                    rest = next;
                    token
                })
            };
            match value {
                Some(value) => args.push(matching::Argument { name: &arg.name, value }),
                None if arg.required => return Err(ParseError::MissingArgument(&arg.name)),
                None => (),
            }
        }
        if let Some((extra, _)) = next_token(rest) {
            return Err(ParseError::UnexpectedArgument(extra));
        }
        Ok(matching::Command { name: &self.name, args })
    }
}
