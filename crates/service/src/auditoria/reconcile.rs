//! Cross-checks executed sessions against signed attendance sheets.
//!
//! Records are grouped per `(carteirinha, numero_guia)`. Inside a group:
//! repeated execution dates are duplicates, same-date pairs are matched and
//! inspected, leftovers are paired by nearest date, and whatever is still
//! alone on either side is an absence.
//!
//! Nearest-date pairing is greedy: leftover executions are taken in date
//! order and each claims the closest sheet still free, ties going to the
//! earlier sheet. A later execution may therefore end up with a farther
//! sheet than a globally optimal assignment would give it.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use models::divergencia::DivergenciaTipo;
use models::limits::{self, check_len};

use crate::errors::ServiceError;

/// One executed session as exported by the insurer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecucaoRegistro {
    pub numero_guia: String,
    pub carteirinha: String,
    #[serde(default)]
    pub paciente_nome: String,
    pub data_execucao: NaiveDate,
    #[serde(default)]
    pub profissional: Option<String>,
    #[serde(default)]
    pub codigo_ficha: Option<String>,
}

/// One attendance sheet, as read from the scanned file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FichaPresenca {
    pub codigo_ficha: String,
    pub numero_guia: String,
    pub carteirinha: String,
    #[serde(default)]
    pub paciente_nome: String,
    pub data_atendimento: NaiveDate,
    #[serde(default)]
    pub profissional: Option<String>,
    #[serde(default)]
    pub possui_assinatura: bool,
    #[serde(default)]
    pub arquivo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Autorizacao {
    pub numero_guia: String,
    pub sessoes_autorizadas: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditoriaEntrada {
    #[serde(default)]
    pub execucoes: Vec<ExecucaoRegistro>,
    #[serde(default)]
    pub fichas: Vec<FichaPresenca>,
    #[serde(default)]
    pub autorizacoes: Vec<Autorizacao>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenciaDetectada {
    pub tipo: DivergenciaTipo,
    pub numero_guia: String,
    pub carteirinha: String,
    pub paciente_nome: String,
    pub data_execucao: Option<NaiveDate>,
    pub data_atendimento: Option<NaiveDate>,
    pub codigo_ficha: Option<String>,
    pub possui_assinatura: bool,
    pub arquivo_digitalizado: Option<String>,
    pub sessoes_autorizadas: Option<i32>,
    pub sessoes_executadas: i32,
    pub descricao: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditoriaResultado {
    pub total_execucoes: usize,
    pub total_fichas: usize,
    /// Pairs that matched on date with nothing to report.
    pub total_conferidos: usize,
    pub divergencias: Vec<DivergenciaDetectada>,
    pub por_tipo: BTreeMap<String, usize>,
    /// Findings stored as divergences; zero for a dry run.
    #[serde(default)]
    pub divergencias_registradas: usize,
    /// Findings not stored because an identical one is still open, or was
    /// already filed earlier in the same run.
    #[serde(default)]
    pub divergencias_ignoradas: usize,
}

/// Rejects records whose grouping keys are blank or whose stored fields
/// would not fit their columns.
pub fn validar(entrada: &AuditoriaEntrada) -> Result<(), ServiceError> {
    for (i, e) in entrada.execucoes.iter().enumerate() {
        if e.numero_guia.trim().is_empty() || e.carteirinha.trim().is_empty() {
            return Err(ServiceError::Validation(format!(
                "execucoes[{i}]: numero_guia and carteirinha are required"
            )));
        }
        larguras(&format!("execucoes[{i}]"), &[
            ("numero_guia", e.numero_guia.trim(), limits::NUMERO_GUIA),
            ("carteirinha", e.carteirinha.trim(), limits::CARTEIRINHA),
            ("paciente_nome", e.paciente_nome.trim(), limits::PACIENTE_NOME),
            ("codigo_ficha", e.codigo_ficha.as_deref().unwrap_or_default().trim(), limits::CODIGO_FICHA),
        ])?;
    }
    for (i, f) in entrada.fichas.iter().enumerate() {
        if f.numero_guia.trim().is_empty() || f.carteirinha.trim().is_empty() {
            return Err(ServiceError::Validation(format!(
                "fichas[{i}]: numero_guia and carteirinha are required"
            )));
        }
        if f.codigo_ficha.trim().is_empty() {
            return Err(ServiceError::Validation(format!("fichas[{i}]: codigo_ficha is required")));
        }
        larguras(&format!("fichas[{i}]"), &[
            ("numero_guia", f.numero_guia.trim(), limits::NUMERO_GUIA),
            ("carteirinha", f.carteirinha.trim(), limits::CARTEIRINHA),
            ("paciente_nome", f.paciente_nome.trim(), limits::PACIENTE_NOME),
            ("codigo_ficha", f.codigo_ficha.trim(), limits::CODIGO_FICHA),
            ("arquivo", f.arquivo.as_deref().unwrap_or_default(), limits::ARQUIVO),
        ])?;
    }
    Ok(())
}

fn larguras(registro: &str, campos: &[(&str, &str, usize)]) -> Result<(), ServiceError> {
    for &(campo, valor, max) in campos {
        check_len(&format!("{registro}.{campo}"), valor, max)?;
    }
    Ok(())
}

fn codigo(c: &str) -> Option<String> {
    Some(c.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

type Chave = (String, String);

fn chave(carteirinha: &str, numero_guia: &str) -> Chave {
    (carteirinha.trim().to_string(), numero_guia.trim().to_string())
}

#[derive(Default)]
struct Grupo<'a> {
    execucoes: Vec<&'a ExecucaoRegistro>,
    fichas: Vec<&'a FichaPresenca>,
}

fn mesmo_profissional(a: Option<&str>, b: Option<&str>) -> bool {
    match (a.map(str::trim).filter(|s| !s.is_empty()), b.map(str::trim).filter(|s| !s.is_empty())) {
        (Some(x), Some(y)) => x.to_lowercase() == y.to_lowercase(),
        _ => true,
    }
}

/// Runs the comparison. Output order is deterministic: groups by key,
/// findings inside a group in rule order.
pub fn conciliar(entrada: &AuditoriaEntrada) -> AuditoriaResultado {
    let autorizadas: HashMap<&str, i32> = entrada
        .autorizacoes
        .iter()
        .map(|a| (a.numero_guia.trim(), a.sessoes_autorizadas))
        .collect();

    let mut grupos: BTreeMap<Chave, Grupo> = BTreeMap::new();
    for e in &entrada.execucoes {
        grupos.entry(chave(&e.carteirinha, &e.numero_guia)).or_default().execucoes.push(e);
    }
    for f in &entrada.fichas {
        grupos.entry(chave(&f.carteirinha, &f.numero_guia)).or_default().fichas.push(f);
    }

    let mut out = AuditoriaResultado {
        total_execucoes: entrada.execucoes.len(),
        total_fichas: entrada.fichas.len(),
        ..Default::default()
    };

    for ((carteirinha, numero_guia), mut g) in grupos {
        g.execucoes.sort_by(|a, b| a.data_execucao.cmp(&b.data_execucao));
        g.fichas.sort_by(|a, b| {
            a.data_atendimento.cmp(&b.data_atendimento).then_with(|| a.codigo_ficha.cmp(&b.codigo_ficha))
        });

        let mut unicas: Vec<&ExecucaoRegistro> = Vec::new();
        let mut duplicadas: Vec<&ExecucaoRegistro> = Vec::new();
        for &e in &g.execucoes {
            if unicas.iter().any(|u| u.data_execucao == e.data_execucao) {
                duplicadas.push(e);
            } else {
                unicas.push(e);
            }
        }
        let sessoes_executadas = unicas.len() as i32;
        let sessoes_autorizadas = autorizadas.get(numero_guia.as_str()).copied();
        let paciente = g
            .execucoes
            .iter()
            .map(|e| e.paciente_nome.trim())
            .chain(g.fichas.iter().map(|f| f.paciente_nome.trim()))
            .find(|n| !n.is_empty())
            .unwrap_or_default()
            .to_string();

        let base = |tipo: DivergenciaTipo, descricao: String| DivergenciaDetectada {
            tipo,
            numero_guia: numero_guia.clone(),
            carteirinha: carteirinha.clone(),
            paciente_nome: paciente.clone(),
            data_execucao: None,
            data_atendimento: None,
            codigo_ficha: None,
            possui_assinatura: false,
            arquivo_digitalizado: None,
            sessoes_autorizadas,
            sessoes_executadas,
            descricao,
        };
        let com_ficha = |mut d: DivergenciaDetectada, f: &FichaPresenca| {
            d.data_atendimento = Some(f.data_atendimento);
            d.codigo_ficha = codigo(&f.codigo_ficha);
            d.possui_assinatura = f.possui_assinatura;
            d.arquivo_digitalizado = f.arquivo.clone();
            d
        };

        for e in duplicadas {
            let mut d = base(
                DivergenciaTipo::Duplicidade,
                format!("execution on {} recorded more than once", e.data_execucao),
            );
            d.data_execucao = Some(e.data_execucao);
            out.divergencias.push(d);
        }

        let mut ficha_usada = vec![false; g.fichas.len()];
        let mut sem_par: Vec<&ExecucaoRegistro> = Vec::new();
        for &e in &unicas {
            let matched = (0..g.fichas.len())
                .find(|&i| !ficha_usada[i] && g.fichas[i].data_atendimento == e.data_execucao);
            let Some(idx) = matched else {
                sem_par.push(e);
                continue;
            };
            ficha_usada[idx] = true;
            let f = g.fichas[idx];
            let mut achou = false;
            if !mesmo_profissional(e.profissional.as_deref(), f.profissional.as_deref()) {
                let mut d = base(
                    DivergenciaTipo::ProfissionalDivergente,
                    format!(
                        "execution by '{}' but sheet {} signed for '{}'",
                        e.profissional.as_deref().unwrap_or_default().trim(),
                        f.codigo_ficha,
                        f.profissional.as_deref().unwrap_or_default().trim()
                    ),
                );
                d.data_execucao = Some(e.data_execucao);
                out.divergencias.push(com_ficha(d, f));
                achou = true;
            }
            if !f.possui_assinatura {
                let mut d = base(
                    DivergenciaTipo::AssinaturaAusente,
                    format!("sheet {} for {} has no patient signature", f.codigo_ficha, f.data_atendimento),
                );
                d.data_execucao = Some(e.data_execucao);
                out.divergencias.push(com_ficha(d, f));
                achou = true;
            }
            if !achou {
                out.total_conferidos += 1;
            }
        }

        for e in sem_par {
            let proxima = (0..g.fichas.len())
                .filter(|&i| !ficha_usada[i])
                .min_by_key(|&i| ((g.fichas[i].data_atendimento - e.data_execucao).num_days().abs(), i));
            match proxima {
                Some(idx) => {
                    ficha_usada[idx] = true;
                    let f = g.fichas[idx];
                    let mut d = base(
                        DivergenciaTipo::DataDivergente,
                        format!(
                            "execution on {} but sheet {} dated {}",
                            e.data_execucao, f.codigo_ficha, f.data_atendimento
                        ),
                    );
                    d.data_execucao = Some(e.data_execucao);
                    out.divergencias.push(com_ficha(d, f));
                }
                None => {
                    let mut d = base(
                        DivergenciaTipo::Ausencia,
                        format!("execution on {} has no attendance sheet", e.data_execucao),
                    );
                    d.data_execucao = Some(e.data_execucao);
                    d.codigo_ficha = e.codigo_ficha.as_deref().and_then(codigo);
                    out.divergencias.push(d);
                }
            }
        }

        for (idx, &f) in g.fichas.iter().enumerate() {
            if ficha_usada[idx] {
                continue;
            }
            let d = base(
                DivergenciaTipo::Ausencia,
                format!("sheet {} dated {} has no execution record", f.codigo_ficha, f.data_atendimento),
            );
            out.divergencias.push(com_ficha(d, f));
        }
    }

    for d in &out.divergencias {
        *out.por_tipo.entry(d.tipo.as_str().to_string()).or_default() += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dia(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 4, d).unwrap() }

    fn exec(guia: &str, d: u32, prof: Option<&str>) -> ExecucaoRegistro {
        ExecucaoRegistro {
            numero_guia: guia.into(),
            carteirinha: "0064".into(),
            paciente_nome: "Ana".into(),
            data_execucao: dia(d),
            profissional: prof.map(str::to_string),
            codigo_ficha: None,
        }
    }

    fn ficha(codigo: &str, guia: &str, d: u32, prof: Option<&str>, assinada: bool) -> FichaPresenca {
        FichaPresenca {
            codigo_ficha: codigo.into(),
            numero_guia: guia.into(),
            carteirinha: "0064".into(),
            paciente_nome: "Ana".into(),
            data_atendimento: dia(d),
            profissional: prof.map(str::to_string),
            possui_assinatura: assinada,
            arquivo: Some(format!("{codigo}.pdf")),
        }
    }

    fn tipos(r: &AuditoriaResultado) -> Vec<DivergenciaTipo> { r.divergencias.iter().map(|d| d.tipo).collect() }

    #[test]
    fn clean_match_has_no_findings() {
        let r = conciliar(&AuditoriaEntrada {
            execucoes: vec![exec("G1", 1, Some("Dra. Lia")), exec("G1", 8, None)],
            fichas: vec![ficha("F1", "G1", 1, Some("dra. lia "), true), ficha("F2", "G1", 8, Some("Rui"), true)],
            autorizacoes: vec![],
        });
        assert!(r.divergencias.is_empty());
        assert_eq!(r.total_conferidos, 2);
        assert_eq!((r.total_execucoes, r.total_fichas), (2, 2));
        assert!(r.por_tipo.is_empty());
    }

    #[test]
    fn repeated_date_is_duplicate() {
        let r = conciliar(&AuditoriaEntrada {
            execucoes: vec![exec("G1", 3, None), exec("G1", 3, None)],
            fichas: vec![ficha("F1", "G1", 3, None, true)],
            autorizacoes: vec![Autorizacao { numero_guia: "G1".into(), sessoes_autorizadas: 10 }],
        });
        assert_eq!(tipos(&r), vec![DivergenciaTipo::Duplicidade]);
        assert_eq!(r.total_conferidos, 1);
        let d = &r.divergencias[0];
        assert_eq!(d.sessoes_executadas, 1);
        assert_eq!(d.sessoes_autorizadas, Some(10));
    }

    #[test]
    fn professional_and_signature_checks_on_matched_pair() {
        let r = conciliar(&AuditoriaEntrada {
            execucoes: vec![exec("G1", 2, Some("Rui"))],
            fichas: vec![ficha("F1", "G1", 2, Some("Lia"), false)],
            autorizacoes: vec![],
        });
        assert_eq!(
            tipos(&r),
            vec![DivergenciaTipo::ProfissionalDivergente, DivergenciaTipo::AssinaturaAusente]
        );
        assert_eq!(r.total_conferidos, 0);
        assert_eq!(r.divergencias[1].codigo_ficha.as_deref(), Some("F1"));
        assert_eq!(r.divergencias[1].arquivo_digitalizado.as_deref(), Some("F1.pdf"));
    }

    #[test]
    fn leftovers_pair_by_nearest_date_then_absence() {
        let r = conciliar(&AuditoriaEntrada {
            execucoes: vec![exec("G1", 10, None), exec("G1", 20, None), exec("G1", 25, None)],
            fichas: vec![ficha("F9", "G1", 2, None, true), ficha("F1", "G1", 11, None, true)],
            autorizacoes: vec![],
        });
        // 10 -> F1 (1 day off), 20 -> F9 (only one left), 25 -> nothing
        assert_eq!(
            tipos(&r),
            vec![DivergenciaTipo::DataDivergente, DivergenciaTipo::DataDivergente, DivergenciaTipo::Ausencia]
        );
        assert_eq!(r.divergencias[0].codigo_ficha.as_deref(), Some("F1"));
        assert_eq!(r.divergencias[1].codigo_ficha.as_deref(), Some("F9"));
        assert_eq!(r.divergencias[2].data_execucao, Some(dia(25)));
        assert_eq!(r.por_tipo["data_divergente"], 2);
    }

    #[test]
    fn sheet_without_execution_is_absence() {
        let r = conciliar(&AuditoriaEntrada {
            execucoes: vec![exec("G1", 1, None)],
            fichas: vec![ficha("F1", "G1", 1, None, true), ficha("F2", "G2", 5, None, true)],
            autorizacoes: vec![],
        });
        assert_eq!(tipos(&r), vec![DivergenciaTipo::Ausencia]);
        let d = &r.divergencias[0];
        assert_eq!(d.numero_guia, "G2");
        assert_eq!(d.data_execucao, None);
        assert_eq!(d.data_atendimento, Some(dia(5)));
        assert_eq!(d.sessoes_executadas, 0);
    }

    #[test]
    fn groups_are_keyed_by_card_and_guide() {
        let mut outra = exec("G1", 1, None);
        outra.carteirinha = "0099".into();
        let r = conciliar(&AuditoriaEntrada {
            execucoes: vec![outra],
            fichas: vec![ficha("F1", "G1", 1, None, true)],
            autorizacoes: vec![],
        });
        // same guide number on another card does not match
        assert_eq!(tipos(&r), vec![DivergenciaTipo::Ausencia, DivergenciaTipo::Ausencia]);
        assert_eq!(r.divergencias[0].carteirinha, "0064");
        assert_eq!(r.divergencias[1].carteirinha, "0099");
    }

    #[test]
    fn blank_keys_are_rejected() {
        let mut e = exec("G1", 1, None);
        e.carteirinha = " ".into();
        let entrada = AuditoriaEntrada { execucoes: vec![e], ..Default::default() };
        assert!(matches!(validar(&entrada), Err(ServiceError::Validation(_))));
        assert!(validar(&AuditoriaEntrada::default()).is_ok());
    }

    #[test]
    fn oversized_fields_are_rejected() {
        let ok = AuditoriaEntrada {
            execucoes: vec![exec(&"9".repeat(limits::NUMERO_GUIA), 1, None)],
            fichas: vec![ficha(&"F".repeat(limits::CODIGO_FICHA), "G1", 1, None, true)],
            autorizacoes: vec![],
        };
        assert!(validar(&ok).is_ok());

        let mut longa = ok.clone();
        longa.fichas[0].codigo_ficha = "F".repeat(limits::CODIGO_FICHA + 1);
        let Err(ServiceError::Validation(msg)) = validar(&longa) else { panic!("expected validation error") };
        assert!(msg.contains("fichas[0].codigo_ficha"), "{msg}");

        let mut longa = ok.clone();
        longa.execucoes[0].numero_guia = "9".repeat(limits::NUMERO_GUIA + 1);
        assert!(matches!(validar(&longa), Err(ServiceError::Validation(_))));

        let mut longa = ok;
        longa.fichas[0].arquivo = Some("a".repeat(limits::ARQUIVO + 1));
        assert!(matches!(validar(&longa), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn sheet_codes_are_trimmed() {
        let mut e = exec("G1", 9, None);
        e.codigo_ficha = Some("  ".into());
        let r = conciliar(&AuditoriaEntrada {
            execucoes: vec![e],
            fichas: vec![ficha(" F3 ", "G2", 1, None, true)],
            autorizacoes: vec![],
        });
        let codigos: Vec<_> = r.divergencias.iter().map(|d| d.codigo_ficha.clone()).collect();
        // G1 (execution only) sorts before G2 (sheet only)
        assert_eq!(codigos, vec![None, Some("F3".to_string())]);
    }
}
