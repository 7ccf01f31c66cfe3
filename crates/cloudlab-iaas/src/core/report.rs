//! Printing of simulation results.

use crate::core::cloudlet::Cloudlet;

/// Formats the number with at most two decimal places, dropping trailing zeros.
pub fn format_decimal(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn format_optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Builds fixed-width table with the state of each cloudlet.
pub fn format_cloudlet_table(cloudlets: &[Cloudlet]) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str("========== OUTPUT ==========\n");
    out.push_str(&format!(
        "{:<15}{:<10}{:<18}{:<9}{:<10}{:<14}{}\n",
        "Cloudlet ID", "STATUS", "Data center ID", "VM ID", "Time", "Start Time", "Finish Time"
    ));
    for cloudlet in cloudlets {
        out.push_str(&format!(
            "{:<15}{:<10}{:<18}{:<9}{:<10}{:<14}{}\n",
            cloudlet.id,
            cloudlet.status.to_string(),
            format_optional(cloudlet.datacenter_id),
            format_optional(cloudlet.vm_id),
            format_decimal(cloudlet.actual_cpu_time),
            format_optional(cloudlet.exec_start_time.map(format_decimal)),
            format_optional(cloudlet.finish_time.map(format_decimal)),
        ));
    }
    out
}

pub fn print_cloudlet_list(cloudlets: &[Cloudlet]) {
    print!("{}", format_cloudlet_table(cloudlets));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloudlet::{CloudletStatus, UtilizationModel};

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(400.), "400");
        assert_eq!(format_decimal(0.), "0");
        assert_eq!(format_decimal(2.5), "2.5");
        assert_eq!(format_decimal(0.1), "0.1");
        assert_eq!(format_decimal(1000.456), "1000.46");
        assert_eq!(format_decimal(-0.001), "0");
    }

    #[test]
    fn test_cloudlet_table() {
        let mut done = Cloudlet::new(0, 400000, 1, 300, 300, UtilizationModel::Full);
        done.status = CloudletStatus::Success;
        done.datacenter_id = Some(2);
        done.vm_id = Some(0);
        done.exec_start_time = Some(0.);
        done.finish_time = Some(400.);
        done.actual_cpu_time = 400.;
        let mut failed = Cloudlet::new(1, 1000, 1, 300, 300, UtilizationModel::Full);
        failed.status = CloudletStatus::Failed;

        let table = format_cloudlet_table(&[done, failed]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[1], "========== OUTPUT ==========");
        assert!(lines[2].starts_with("Cloudlet ID    STATUS    Data center ID    VM ID"));
        let row: Vec<&str> = lines[3].split_whitespace().collect();
        assert_eq!(row, vec!["0", "SUCCESS", "2", "0", "400", "0", "400"]);
        let row: Vec<&str> = lines[4].split_whitespace().collect();
        assert_eq!(row, vec!["1", "FAILED", "-", "-", "0", "-", "-"]);
    }
}
