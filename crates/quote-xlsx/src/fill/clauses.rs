//! Fixed Spanish wording of the quote's title and trailing blocks.

use chrono::{Datelike, NaiveDate};

use super::payload::PaymentTerm;

const LEAD_TIME_TAIL: &str = "este tiempo será evaluado de acuerdo a la cantidad de muestra \
recepcionada y está sujeto a la programacion enviada por el Laboratorio de Ensayos de Materiales. \
- El laboratorio enviará un correo de confirmación de recepción y fecha de entrega del informe.";

pub fn title(number: &str, issue_date: NaiveDate) -> String {
    format!("COTIZACIÓN DE LABORATORIO N° {number}-{}", issue_date.year() % 100)
}

/// `dd/mm/yyyy`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn special_conditions(conditions: &[String]) -> String {
    let mut text = String::from("CONDICIONES ESPECÍFICAS:\n");
    for condition in conditions {
        text.push_str("- ");
        text.push_str(condition);
        text.push('\n');
    }
    text
}

pub fn lead_time(days: u32) -> String {
    if days > 0 {
        format!(
            "PLAZO ESTIMADO DE EJECUCIÓN DE SERVICIO: - El plazo de entrega de los resultados se \
estima en {days} días hábiles, {LEAD_TIME_TAIL}"
        )
    } else {
        format!(
            "PLAZO ESTIMADO DE EJECUCIÓN DE SERVICIO: - El plazo de entrega de los resultados se \
estima de acuerdo a la programacion recepcion, {LEAD_TIME_TAIL}"
        )
    }
}

impl PaymentTerm {
    pub fn sentence(self) -> &'static str {
        match self {
            PaymentTerm::MonthlyValuation => {
                "El pago del servicio se realizará de acuerdo a la valorización mensual."
            }
            PaymentTerm::Prepaid => "El pago del servicio deberá ser realizado por Adelantado.",
            PaymentTerm::HalfUpfront => {
                "El pago del servicio Adelanto el 50% y saldo previo a la entrega del Informe."
            }
            PaymentTerm::Credit7 => "El pago del servicio Crédito a 7 días, previa orden de servicio.",
            PaymentTerm::Credit15 => "El pago del servicio Crédito a 15 días, previa orden de servicio.",
            PaymentTerm::Credit30 => "El pago del servicio Crédito a 30 días, previa orden de servicio.",
        }
    }
}

pub fn payment(term: PaymentTerm) -> String {
    format!("CONDICIÓN: {}", term.sentence())
}

pub fn acceptance(email: &str) -> String {
    format!(
        "La aceptación de la cotización por parte del cliente podrá manifestarse a través de \
cualquiera de las siguientes acciones: el pago correspondiente al servicio, el envío de la orden \
de servicio, o el envío de un correo electrónico confirmando la aceptación del servicio según la \
presente cotización, al correo {email} y/o mediante mensaje de WhatsApp al número del asesor \
comercial, en señal de conformidad."
    )
}
